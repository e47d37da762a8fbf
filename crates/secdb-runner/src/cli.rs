//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "secdb-run")]
#[command(about = "Classify a comment dataset with an LLM and score it against ground truth", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "secdb.yaml")]
    pub config: PathBuf,

    /// Input dataset (JSON array, single object, or NDJSON)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output base path; the model name and extension are appended
    #[arg(short, long)]
    pub output: Option<String>,

    /// Model identifier
    #[arg(short, long)]
    pub model: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// API key for the model endpoint
    #[arg(long, env = "SECDB_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Number of parallel workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Only classify the first N records
    #[arg(long)]
    pub limit: Option<usize>,

    /// Replace the comment text with its length in outputs
    #[arg(long)]
    pub hide_comments: bool,

    /// Send the instruction preamble as a system message
    #[arg(long)]
    pub system_prompt: bool,

    /// Print non-empty diagnostics in the final report
    #[arg(long)]
    pub diagnostics: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
