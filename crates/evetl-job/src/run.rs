// Transform run orchestration
//
// list sources -> read -> derive -> append partitions -> commit run record

use anyhow::{Context, Result};
use chrono::Utc;
use evetl_core::{process_session_csv, ParseStats, PARTITION_COLUMNS};
use evetl_writer::opendal::Operator;
use evetl_writer::{
    list_source_objects, read_object, DatasetWriter, PartitionSpec, RunLedger, RunRecord,
    StorageLocation,
};

/// Identity and locations of one run
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_name: String,
    pub run_id: String,
    pub source: StorageLocation,
    pub target: StorageLocation,
}

/// What a run did
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub run_id: String,
    /// Set when the replay guard found an earlier committed run for the source
    pub skipped_by: Option<String>,
    pub objects_read: usize,
    pub empty_objects: usize,
    pub input_rows: u64,
    pub output_rows: u64,
    pub files_written: usize,
    pub parse_stats: ParseStats,
    /// Path of the committed run record
    pub record_path: Option<String>,
}

pub struct TransformJob {
    source_operator: Operator,
    target_operator: Operator,
    skip_processed_sources: bool,
}

impl TransformJob {
    pub fn new(source_operator: Operator, target_operator: Operator) -> Self {
        Self {
            source_operator,
            target_operator,
            skip_processed_sources: false,
        }
    }

    /// Skip sources that an earlier committed run of the same job processed.
    pub fn with_skip_processed_sources(mut self, enabled: bool) -> Self {
        self.skip_processed_sources = enabled;
        self
    }

    pub async fn run(&self, ctx: &JobContext) -> Result<RunSummary> {
        let started_at = Utc::now();
        let source = ctx.source.to_string();
        let target = ctx.target.as_dir();
        let ledger = RunLedger::new(
            self.target_operator.clone(),
            target.dir_path(),
            ctx.job_name.as_str(),
        );

        tracing::info!(
            job_name = %ctx.job_name,
            run_id = %ctx.run_id,
            source = %source,
            target = %target,
            "Starting transform run"
        );

        if self.skip_processed_sources {
            if let Some(previous) = ledger
                .find_committed_source(&source)
                .await
                .context("Failed to read committed run records")?
            {
                tracing::info!(
                    source = %source,
                    previous_run_id = %previous.run_id,
                    "Source already processed; skipping"
                );
                return Ok(RunSummary {
                    run_id: ctx.run_id.clone(),
                    skipped_by: Some(previous.run_id),
                    ..Default::default()
                });
            }
        }

        let objects = list_source_objects(&self.source_operator, &ctx.source)
            .await
            .with_context(|| format!("Failed to resolve source '{}'", source))?;

        let mut writer = DatasetWriter::new(
            self.target_operator.clone(),
            target.dir_path(),
            PartitionSpec::new(PARTITION_COLUMNS),
            ctx.run_id.as_str(),
        );
        let mut summary = RunSummary {
            run_id: ctx.run_id.clone(),
            ..Default::default()
        };

        for object in &objects {
            let bytes = read_object(&self.source_operator, &object.path).await?;
            if bytes.is_empty() {
                tracing::debug!(path = %object.path, "Skipping empty object");
                summary.empty_objects += 1;
                continue;
            }

            let result = process_session_csv(&bytes)
                .with_context(|| format!("Failed to process '{}'", object.path))?;
            for batch in &result.batches {
                writer
                    .append(batch)
                    .await
                    .with_context(|| format!("Failed to write rows from '{}'", object.path))?;
            }

            summary.objects_read += 1;
            summary.input_rows += result.input_rows as u64;
            summary.parse_stats += result.parse_stats;
        }

        summary.output_rows = writer.rows_written();
        let files = writer.into_files();
        summary.files_written = files.len();

        let record = RunRecord {
            job_name: ctx.job_name.clone(),
            run_id: ctx.run_id.clone(),
            source,
            target: target.to_string(),
            input_rows: summary.input_rows,
            output_rows: summary.output_rows,
            files,
            started_at,
            committed_at: Utc::now(),
        };
        let record_path = ledger
            .commit(&record)
            .await
            .context("Failed to commit run")?;
        summary.record_path = Some(record_path);

        tracing::info!(
            run_id = %summary.run_id,
            objects = summary.objects_read,
            input_rows = summary.input_rows,
            output_rows = summary.output_rows,
            files = summary.files_written,
            "Transform run complete"
        );
        Ok(summary)
    }
}
