//! Concurrent dispatch of classification requests
//!
//! A fixed pool of workers pulls record positions from a shared cursor. Each
//! worker owns its backend handle and writes its results straight into a
//! slot array indexed by record identifier, so the collected output is in
//! input order no matter which worker finishes first.

use crate::backend::BackendFactory;
use crate::client::{ClassificationClient, LazyBackend};
use futures::FutureExt;
use secdb_core::{ClassificationResult, CommentRecord, CompletionObserver, Result};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Worker pool settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Maximum number of simultaneous in-flight classifications
    pub workers: usize,
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(secdb_core::Error::config("dispatch.workers must be at least 1"));
        }
        Ok(())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { workers: 50 }
    }
}

/// Fixed-length result arena. Each slot is written at most once.
struct ResultSlots {
    slots: Vec<OnceLock<ClassificationResult>>,
}

impl ResultSlots {
    fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| OnceLock::new()).collect(),
        }
    }

    fn store(&self, index: usize, result: ClassificationResult) -> bool {
        self.slots[index].set(result).is_ok()
    }

    /// Results in slot order; unfilled slots become worker faults
    fn collect(&self) -> Vec<ClassificationResult> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.get().cloned().unwrap_or_else(|| {
                    warn!(identifier = index, "No result recorded for record");
                    ClassificationResult::worker_fault(index, "no result recorded")
                })
            })
            .collect()
    }
}

/// State shared by every worker of one dispatch
struct WorkerContext {
    records: Arc<[CommentRecord]>,
    slots: ResultSlots,
    cursor: AtomicUsize,
    client: ClassificationClient,
    factory: Arc<dyn BackendFactory>,
    observer: Arc<dyn CompletionObserver>,
}

/// Runs the classification client over many records in parallel
pub struct Dispatcher {
    client: ClassificationClient,
    factory: Arc<dyn BackendFactory>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        client: ClassificationClient,
        factory: Arc<dyn BackendFactory>,
        config: DispatchConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client,
            factory,
            config,
        })
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Classify every record and return one result per record, ordered by
    /// identifier.
    ///
    /// Identifiers must be distinct and below `records.len()`. Per-record
    /// failures are reported inside the results; only invalid identifiers
    /// produce an `Err`.
    pub async fn run(
        &self,
        records: Arc<[CommentRecord]>,
        observer: Arc<dyn CompletionObserver>,
    ) -> Result<Vec<ClassificationResult>> {
        validate_identifiers(&records)?;

        let total = records.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let worker_count = self.config.workers.min(total);
        info!(records = total, workers = worker_count, "Dispatching classifications");
        let start = Instant::now();

        let context = Arc::new(WorkerContext {
            records,
            slots: ResultSlots::new(total),
            cursor: AtomicUsize::new(0),
            client: self.client.clone(),
            factory: Arc::clone(&self.factory),
            observer,
        });

        let mut join_set = JoinSet::new();
        for worker_id in 0..worker_count {
            join_set.spawn(run_worker(worker_id, Arc::clone(&context)));
        }

        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Dispatcher worker exited abnormally");
            }
        }

        info!(
            records = total,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Dispatch complete"
        );

        Ok(context.slots.collect())
    }
}

async fn run_worker(worker_id: usize, context: Arc<WorkerContext>) {
    let mut backend = LazyBackend::new(Arc::clone(&context.factory));
    let mut handled = 0usize;

    loop {
        let position = context.cursor.fetch_add(1, Ordering::Relaxed);
        let Some(record) = context.records.get(position) else {
            break;
        };

        let attempt = AssertUnwindSafe(context.client.classify_record(&mut backend, record))
            .catch_unwind()
            .await;

        let result = match attempt {
            Ok(result) => result,
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                warn!(worker_id, identifier = record.identifier, error = %detail, "Worker fault");
                // Drop the handle in case the fault left it unusable
                backend = LazyBackend::new(Arc::clone(&context.factory));
                ClassificationResult::worker_fault(record.identifier, detail)
            }
        };

        metrics::counter!("secdb_classifications_total", "outcome" => outcome_label(&result))
            .increment(1);

        let notified = std::panic::catch_unwind(AssertUnwindSafe(|| {
            context.observer.on_complete(record, &result)
        }));
        if notified.is_err() {
            warn!(worker_id, identifier = record.identifier, "Completion observer panicked");
        }

        if !context.slots.store(record.identifier, result) {
            warn!(identifier = record.identifier, "Result slot already written");
        }
        handled += 1;
    }

    debug!(worker_id, handled, "Worker finished");
}

fn validate_identifiers(records: &[CommentRecord]) -> Result<()> {
    let mut seen = vec![false; records.len()];
    for record in records {
        match seen.get_mut(record.identifier) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => {
                return Err(secdb_core::Error::input(format!(
                    "duplicate record identifier {}",
                    record.identifier
                )))
            }
            None => {
                return Err(secdb_core::Error::input(format!(
                    "record identifier {} out of range for {} records",
                    record.identifier,
                    records.len()
                )))
            }
        }
    }
    Ok(())
}

fn outcome_label(result: &ClassificationResult) -> &'static str {
    match (&result.error, &result.note) {
        (Some(error), _) if error.starts_with("worker fault") => "worker_fault",
        (Some(_), _) => "failed",
        (None, Some(_)) => "empty",
        (None, None) => "answered",
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
