//! SecDB Runner
//!
//! Classifies every comment in a dataset with a remote chat model and reports
//! how well the predictions match the stored labels.

use anyhow::Result;
use clap::Parser;
use secdb_classifiers::OpenAiBackendFactory;
use secdb_runner::{Cli, RunConfig};
use secdb_telemetry::render_report;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config = RunConfig::load(&cli)?;
    info!("Model: {} is loaded", config.model.name);
    info!("Input: {}", config.input_path.display());
    info!("Parallel workers: {}", config.dispatch.workers);

    let factory = Arc::new(OpenAiBackendFactory::new(config.backend_config()));
    let outcome = secdb_runner::run(&config, factory).await?;

    println!("Finished.");
    print!("{}", render_report(&outcome.scoreboard, cli.diagnostics));
    println!();
    println!("Wrote files:");
    println!(" - {}", outcome.outputs.json.display());
    println!(" - {}", outcome.outputs.csv.display());

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("secdb=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("secdb=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
