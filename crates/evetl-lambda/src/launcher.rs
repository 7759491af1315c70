// Job-run submission
//
// The orchestration service sits behind `JobLauncher` so the handler can be
// exercised without AWS. `GlueJobLauncher` is the production implementation.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_glue::error::DisplayErrorContext;
use std::collections::BTreeMap;

use crate::error::DispatchError;

pub const RAW_PATH_ARG: &str = "--RAW_S3_PATH";
pub const TARGET_PATH_ARG: &str = "--TARGET_S3_PATH";

/// One asynchronous job-run request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRunRequest {
    pub job_name: String,
    pub arguments: BTreeMap<String, String>,
}

impl JobRunRequest {
    /// Request carrying exactly the source and target arguments.
    pub fn new(job_name: &str, source: &str, target: &str) -> Self {
        let mut arguments = BTreeMap::new();
        arguments.insert(RAW_PATH_ARG.to_string(), source.to_string());
        arguments.insert(TARGET_PATH_ARG.to_string(), target.to_string());
        Self {
            job_name: job_name.to_string(),
            arguments,
        }
    }
}

/// Starts job runs and returns the service-assigned run id
#[async_trait]
pub trait JobLauncher: Send + Sync {
    async fn start_job_run(&self, request: &JobRunRequest) -> Result<String, DispatchError>;
}

/// AWS Glue `StartJobRun`
pub struct GlueJobLauncher {
    client: aws_sdk_glue::Client,
}

impl GlueJobLauncher {
    pub fn new(client: aws_sdk_glue::Client) -> Self {
        Self { client }
    }

    /// Build a client from the default credential chain in `region`.
    pub async fn from_region(region: &str) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;
        Self::new(aws_sdk_glue::Client::new(&sdk_config))
    }
}

#[async_trait]
impl JobLauncher for GlueJobLauncher {
    async fn start_job_run(&self, request: &JobRunRequest) -> Result<String, DispatchError> {
        let mut call = self.client.start_job_run().job_name(&request.job_name);
        for (key, value) in &request.arguments {
            call = call.arguments(key, value);
        }

        let output = call.send().await.map_err(|e| {
            DispatchError::submission(&request.job_name, DisplayErrorContext(&e).to_string())
        })?;

        output.job_run_id().map(str::to_string).ok_or_else(|| {
            DispatchError::submission(&request.job_name, "response did not include a job run id")
        })
    }
}
