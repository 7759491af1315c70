//! Run commit records
//!
//! A run is committed by writing `<root>/_job_runs/<job_name>/<run_id>.json`
//! and then touching `<root>/_SUCCESS`. Data files written by a run that
//! never committed have no run record.

use chrono::{DateTime, Utc};
use opendal::{ErrorKind, Operator};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};
use crate::write::WrittenFile;

pub const RUNS_DIR: &str = "_job_runs";
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Commit document for one run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub job_name: String,
    pub run_id: String,
    /// Fully-qualified source location the run read from
    pub source: String,
    /// Fully-qualified destination root
    pub target: String,
    pub input_rows: u64,
    pub output_rows: u64,
    pub files: Vec<WrittenFile>,
    pub started_at: DateTime<Utc>,
    pub committed_at: DateTime<Utc>,
}

pub struct RunLedger {
    operator: Operator,
    root: String,
    job_name: String,
}

impl RunLedger {
    pub fn new(operator: Operator, root: impl Into<String>, job_name: impl Into<String>) -> Self {
        let mut root = root.into();
        if !root.is_empty() && !root.ends_with('/') {
            root.push('/');
        }
        Self {
            operator,
            root,
            job_name: job_name.into(),
        }
    }

    fn runs_dir(&self) -> String {
        format!("{}{}/{}/", self.root, RUNS_DIR, self.job_name)
    }

    pub fn record_path(&self, run_id: &str) -> String {
        format!("{}{}.json", self.runs_dir(), run_id)
    }

    pub fn success_marker_path(&self) -> String {
        format!("{}{}", self.root, SUCCESS_MARKER)
    }

    /// Persist the run record, then the success marker.
    pub async fn commit(&self, record: &RunRecord) -> Result<String> {
        let path = self.record_path(&record.run_id);
        let body = serde_json::to_vec_pretty(record).map_err(|e| {
            StorageError::write_failure(format!("Failed to serialize run record: {}", e))
        })?;

        self.operator.write(&path, body).await.map_err(|e| {
            StorageError::write_failure(format!("Failed to write run record '{}': {}", path, e))
        })?;

        let marker = self.success_marker_path();
        self.operator
            .write(&marker, Vec::<u8>::new())
            .await
            .map_err(|e| {
                StorageError::write_failure(format!("Failed to write '{}': {}", marker, e))
            })?;

        tracing::info!(
            job_name = %record.job_name,
            run_id = %record.run_id,
            files = record.files.len(),
            output_rows = record.output_rows,
            "Committed run"
        );
        Ok(path)
    }

    /// All committed runs of this job, oldest first by commit time.
    ///
    /// Records that fail to parse are logged and skipped.
    pub async fn committed_runs(&self) -> Result<Vec<RunRecord>> {
        let dir = self.runs_dir();
        let entries = match self.operator.list(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::read_failure(format!(
                    "Failed to list run records under '{}': {}",
                    dir, e
                )));
            }
        };

        let mut records = Vec::new();
        for entry in entries {
            if !entry.metadata().is_file() || !entry.path().ends_with(".json") {
                continue;
            }
            let bytes = match self.operator.read(entry.path()).await {
                Ok(buffer) => buffer.to_vec(),
                Err(e) => {
                    return Err(StorageError::read_failure(format!(
                        "Failed to read run record '{}': {}",
                        entry.path(),
                        e
                    )));
                }
            };
            match serde_json::from_slice::<RunRecord>(&bytes) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %entry.path(), error = %e, "Ignoring unreadable run record");
                }
            }
        }

        records.sort_by(|a, b| a.committed_at.cmp(&b.committed_at));
        Ok(records)
    }

    /// Earliest committed run that read `source`, if any.
    pub async fn find_committed_source(&self, source: &str) -> Result<Option<RunRecord>> {
        let runs = self.committed_runs().await?;
        Ok(runs.into_iter().find(|run| run.source == source))
    }
}
