//! Classification client: one comment in, one label answer out
//!
//! Each request runs through a small state machine:
//!
//! ```text
//! Idle -> Attempting(n) -> Success
//!                       -> RetryWait -> Attempting(n + 1)
//!                       -> TerminalFailure
//! ```
//!
//! Retryable backend failures wait `policy.delay_after(n)` before the next
//! attempt. Non-retryable failures, or a retryable failure on the last
//! attempt, end the request.

use crate::backend::{BackendError, BackendFactory, ChatBackend};
use crate::normalize::{NormalizeError, NormalizedAnswer, ResponseNormalizer};
use crate::prompt::PromptTemplate;
use crate::retry::RetryPolicy;
use secdb_core::{ClassificationResult, CommentRecord};
use std::sync::Arc;
use tracing::{debug, warn};

/// Terminal failure of one classification
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifyError {
    /// The backend failed and no further attempts are allowed
    #[error("{error}")]
    Backend { error: BackendError, attempts: u32 },

    /// The backend answered but nothing usable could be extracted
    #[error("{0}")]
    NoUsableAnswer(#[from] NormalizeError),
}

/// A worker's exclusive backend handle, created on first use
pub struct LazyBackend {
    factory: Arc<dyn BackendFactory>,
    handle: Option<Box<dyn ChatBackend>>,
}

impl LazyBackend {
    pub fn new(factory: Arc<dyn BackendFactory>) -> Self {
        Self {
            factory,
            handle: None,
        }
    }

    /// Connect if needed. A failed connect is retried on the next call.
    pub fn get(&mut self) -> Result<&dyn ChatBackend, BackendError> {
        if self.handle.is_none() {
            debug!("Creating backend handle for worker");
            self.handle = Some(self.factory.connect()?);
        }
        match self.handle.as_deref() {
            Some(backend) => Ok(backend),
            None => Err(BackendError::Unexpected("backend handle missing".to_string())),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }
}

/// Prompt, normalizer, and retry policy shared by every worker
#[derive(Debug, Clone)]
pub struct ClassificationClient {
    prompt: Arc<PromptTemplate>,
    normalizer: Arc<ResponseNormalizer>,
    retry: RetryPolicy,
}

impl ClassificationClient {
    pub fn new(prompt: PromptTemplate, normalizer: ResponseNormalizer, retry: RetryPolicy) -> Self {
        Self {
            prompt: Arc::new(prompt),
            normalizer: Arc::new(normalizer),
            retry,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Classify non-empty `text` with bounded retry
    pub async fn classify(
        &self,
        backend: &dyn ChatBackend,
        text: &str,
    ) -> Result<NormalizedAnswer, ClassifyError> {
        let messages = self.prompt.build_messages(text);
        let mut attempt = 1;

        loop {
            match backend.complete(&messages).await {
                Ok(content) => {
                    debug!(attempt, "Backend answered");
                    return Ok(self.normalizer.normalize(&content)?);
                }
                Err(error) if error.is_retryable() && !self.retry.is_last(attempt) => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retryable backend failure"
                    );
                    metrics::counter!("secdb_retries_total", "kind" => error.kind()).increment(1);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    warn!(attempt, error = %error, "Backend failure is terminal");
                    return Err(ClassifyError::Backend {
                        error,
                        attempts: attempt,
                    });
                }
            }
        }
    }

    /// Classify one record into its result.
    ///
    /// Records without text never touch the backend.
    pub async fn classify_record(
        &self,
        backend: &mut LazyBackend,
        record: &CommentRecord,
    ) -> ClassificationResult {
        if !record.has_text() {
            return ClassificationResult::empty_input(record.identifier);
        }

        let comment_length = record.text.chars().count();
        let handle = match backend.get() {
            Ok(handle) => handle,
            Err(error) => {
                return ClassificationResult::failed(record.identifier, error.to_string(), comment_length)
            }
        };

        match self.classify(handle, &record.text).await {
            Ok(answer) => ClassificationResult::answered(
                record.identifier,
                answer.raw_answer,
                answer.labels,
                comment_length,
            ),
            Err(error) => {
                ClassificationResult::failed(record.identifier, error.to_string(), comment_length)
            }
        }
    }
}

impl Default for ClassificationClient {
    fn default() -> Self {
        Self::new(
            PromptTemplate::default(),
            ResponseNormalizer::default(),
            RetryPolicy::default(),
        )
    }
}
