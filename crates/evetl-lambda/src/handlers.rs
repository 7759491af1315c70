// S3 notification handling
//
// Turns the first record of an upload event into one job-run request.

use aws_lambda_events::event::s3::S3Event;
use evetl_config::DispatchConfig;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::launcher::{JobLauncher, JobRunRequest};

/// Returned to the invoker after a successful submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub job_run_id: String,
    pub source_path: String,
    pub target_path: String,
}

/// Decode an S3 notification key: `+` is a space, then percent-decoding.
pub fn decode_object_key(raw_key: &str) -> Result<String, DispatchError> {
    let spaced = raw_key.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|e| DispatchError::InvalidKey {
            key: raw_key.to_string(),
            reason: e.to_string(),
        })
}

pub fn source_location(scheme: &str, bucket: &str, key: &str) -> String {
    format!("{}://{}/{}", scheme, bucket, key)
}

/// Parse a raw invocation payload as an S3 notification.
pub fn parse_event(payload: serde_json::Value) -> Result<S3Event, DispatchError> {
    serde_json::from_value(payload).map_err(|e| DispatchError::malformed(e.to_string()))
}

/// Submit one job run for the first record in `event`.
pub async fn dispatch(
    event: &S3Event,
    config: &DispatchConfig,
    launcher: &dyn JobLauncher,
) -> Result<DispatchOutcome, DispatchError> {
    let record = event
        .records
        .first()
        .ok_or_else(|| DispatchError::malformed("event contains no records"))?;

    if event.records.len() > 1 {
        tracing::warn!(
            records = event.records.len(),
            "Event carries multiple records; dispatching the first only"
        );
    }

    let bucket = record
        .s3
        .bucket
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| DispatchError::malformed("record has no bucket name"))?;
    let raw_key = record
        .s3
        .object
        .key
        .as_deref()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| DispatchError::malformed("record has no object key"))?;

    let key = decode_object_key(raw_key)?;
    let source_path = source_location(&config.source_scheme, bucket, &key);
    let request = JobRunRequest::new(&config.job_name, &source_path, &config.target_path);

    tracing::info!(
        job_name = %config.job_name,
        source = %source_path,
        target = %config.target_path,
        "Starting job run"
    );

    let job_run_id = match launcher.start_job_run(&request).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(job_name = %config.job_name, error = %e, "Job run submission failed");
            return Err(e);
        }
    };

    tracing::info!(job_run_id = %job_run_id, "Started job run");

    Ok(DispatchOutcome {
        job_run_id,
        source_path,
        target_path: config.target_path.clone(),
    })
}
