//! SecDB Runner
//!
//! Batch evaluation of an LLM classifier over a labelled comment dataset.
//! Loads the dataset, classifies every comment in parallel, scores the
//! predictions against the stored labels, and writes JSON and CSV results.

pub mod cli;
pub mod config;
pub mod input;
pub mod output;
pub mod pipeline;

pub use cli::Cli;
pub use config::RunConfig;
pub use output::{OutputPaths, ResultWriter};
pub use pipeline::{load_dataset, run, RunOutcome};
