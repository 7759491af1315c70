// evetl-job - Transform job for EV charging sessions
//
// Resolves job arguments, builds storage operators from configuration and
// runs one transform from a source location into the partitioned dataset.

use anyhow::{Context, Result};
use evetl_config::RuntimeConfig;
use evetl_writer::{set_parquet_row_group_size, OperatorFactory, StorageLocation};

mod args;
mod run;

pub use args::{select_job_options, JobArgs, JOB_ARG_KEYS};
pub use run::{JobContext, RunSummary, TransformJob};

impl JobContext {
    /// Parse locations and pick a run id from resolved arguments.
    pub fn from_args(args: &JobArgs) -> Result<Self> {
        let source = StorageLocation::parse(&args.raw_s3_path).context("Invalid RAW_S3_PATH")?;
        let target =
            StorageLocation::parse(&args.target_s3_path).context("Invalid TARGET_S3_PATH")?;
        let run_id = args
            .job_run_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(Self {
            job_name: args.job_name.clone(),
            run_id,
            source,
            target,
        })
    }
}

/// Run one transform against real storage.
pub async fn run_job(args: &JobArgs, config: &RuntimeConfig) -> Result<RunSummary> {
    let ctx = JobContext::from_args(args)?;

    set_parquet_row_group_size(config.transform.parquet_row_group_size);

    let factory = OperatorFactory::from_config(&config.storage);
    let source_operator = factory
        .operator_for(&ctx.source)
        .context("Failed to initialize source storage")?;
    let target_operator = factory
        .operator_for(&ctx.target)
        .context("Failed to initialize target storage")?;

    TransformJob::new(source_operator, target_operator)
        .with_skip_processed_sources(config.transform.skip_processed_sources)
        .run(&ctx)
        .await
}
