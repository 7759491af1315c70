// AWS Lambda dispatcher
//
// Receives S3 upload notifications and starts one transform job run per
// event through the orchestration service.

use evetl_config::{init_tracing, DispatchConfig, RuntimeConfig};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use std::sync::Arc;

mod error;
mod handlers;
mod launcher;

pub use error::DispatchError;
pub use handlers::{decode_object_key, dispatch, parse_event, source_location, DispatchOutcome};
pub use launcher::{GlueJobLauncher, JobLauncher, JobRunRequest, RAW_PATH_ARG, TARGET_PATH_ARG};

pub struct DispatchState {
    pub config: DispatchConfig,
    pub launcher: Arc<dyn JobLauncher>,
}

/// Lambda handler for S3 notifications
pub async fn handle_event(
    event: LambdaEvent<serde_json::Value>,
    state: Arc<DispatchState>,
) -> Result<DispatchOutcome, Error> {
    let (payload, context) = event.into_parts();
    tracing::debug!(request_id = %context.request_id, "Received event");

    let outcome = match parse_event(payload) {
        Ok(event) => dispatch(&event, &state.config, state.launcher.as_ref()).await,
        Err(e) => Err(e),
    };

    outcome.map_err(|e| {
        tracing::error!(error = %e, "Dispatch failed");
        Error::from(e)
    })
}

/// Lambda runtime entry point
pub async fn run() -> Result<(), Error> {
    let config = RuntimeConfig::load()
        .map_err(|e| Error::from(format!("Failed to load configuration: {:#}", e)))?;
    init_tracing(&config.logging);

    tracing::info!(
        job_name = %config.dispatch.job_name,
        target = %config.dispatch.target_path,
        region = %config.storage.region,
        "Dispatcher starting"
    );

    let launcher = GlueJobLauncher::from_region(&config.storage.region).await;
    let state = Arc::new(DispatchState {
        config: config.dispatch,
        launcher: Arc::new(launcher),
    });

    lambda_runtime::run(service_fn(move |event: LambdaEvent<serde_json::Value>| {
        let state = state.clone();
        async move { handle_event(event, state).await }
    }))
    .await
}
