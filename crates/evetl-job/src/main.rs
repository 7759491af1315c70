use anyhow::{Context, Result};
use evetl_config::{init_tracing, RuntimeConfig};
use evetl_job::{run_job, JobArgs};
use std::process::ExitCode;

fn main() -> ExitCode {
    // Prints usage and exits on missing or malformed job parameters
    let args = JobArgs::resolve(std::env::args()).unwrap_or_else(|e| e.exit());

    let config = match RuntimeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: failed to load configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.logging);

    match run(args, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Transform job failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: JobArgs, config: RuntimeConfig) -> Result<()> {
    let summary = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(run_job(&args, &config))?;

    if let Some(previous) = &summary.skipped_by {
        tracing::info!(previous_run_id = %previous, "Nothing to do");
    }
    Ok(())
}
