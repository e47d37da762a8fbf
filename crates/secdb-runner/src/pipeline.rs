//! One end-to-end run: load, classify, score, write

use crate::config::RunConfig;
use crate::input::{load_records, InputFields};
use crate::output::{OutputPaths, ResultWriter};
use secdb_classifiers::{BackendFactory, ClassificationClient, Dispatcher, ResponseNormalizer};
use secdb_core::{ClassificationResult, CommentRecord, Error};
use secdb_telemetry::{final_pass, LiveMetrics, Scoreboard};
use std::sync::Arc;
use tracing::info;

/// What a finished run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub records: Arc<[CommentRecord]>,
    pub results: Vec<ClassificationResult>,
    pub scoreboard: Scoreboard,
    pub outputs: OutputPaths,
}

/// Load the configured dataset. An empty dataset is an error.
pub fn load_dataset(config: &RunConfig) -> secdb_core::Result<Vec<CommentRecord>> {
    let fields = InputFields {
        text_field: config.text_field.clone(),
        label_field: config.label_field.clone(),
    };
    let records = load_records(&config.input_path, &fields, config.limit)?;
    if records.is_empty() {
        return Err(Error::input(format!(
            "no records found in input {}",
            config.input_path.display()
        )));
    }
    Ok(records)
}

/// Classify every record with backends from `factory`, score them, and write
/// the result files.
pub async fn run(config: &RunConfig, factory: Arc<dyn BackendFactory>) -> anyhow::Result<RunOutcome> {
    let records: Arc<[CommentRecord]> = load_dataset(config)?.into();
    info!(records = records.len(), input = %config.input_path.display(), "Dataset loaded");

    let client = ClassificationClient::new(
        config.prompt_template()?,
        ResponseNormalizer::new()?,
        config.retry_policy()?,
    );
    let dispatcher = Dispatcher::new(client, factory, config.dispatch_config())?;

    let policy = config.scoring_policy();
    let live = Arc::new(LiveMetrics::new(
        policy,
        records.len(),
        config.dispatch.progress_interval,
    ));

    let results = dispatcher.run(Arc::clone(&records), live.clone()).await?;

    let scoreboard = final_pass(&records, &results, policy)?;
    if scoreboard != live.scoreboard() {
        tracing::warn!("Live totals differ from the final pass; reporting the final pass");
    }

    let outputs = OutputPaths::new(&config.output_basename, &config.model.name);
    ResultWriter::new(config.text_field.clone(), config.show_comments).write(&outputs, &records, &results)?;
    info!(json = %outputs.json.display(), csv = %outputs.csv.display(), "Results written");

    Ok(RunOutcome {
        records,
        results,
        scoreboard,
        outputs,
    })
}
