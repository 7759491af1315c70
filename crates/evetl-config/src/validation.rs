// Configuration validation
//
// Validates that required fields are present and values are sensible

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

const SUPPORTED_SCHEMES: [&str; 4] = ["s3", "s3a", "s3n", "file"];

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_dispatch_config(&config.dispatch)?;
    validate_transform_config(&config.transform)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

fn validate_dispatch_config(config: &DispatchConfig) -> Result<()> {
    if config.job_name.trim().is_empty() {
        bail!("dispatch.job_name must not be empty");
    }

    let Some((scheme, rest)) = config.target_path.split_once("://") else {
        bail!(
            "dispatch.target_path must be a location like s3://bucket/prefix/, got '{}'",
            config.target_path
        );
    };
    if !SUPPORTED_SCHEMES.contains(&scheme) {
        bail!(
            "dispatch.target_path uses unsupported scheme '{}'. Supported: {}",
            scheme,
            SUPPORTED_SCHEMES.join(", ")
        );
    }
    if rest.is_empty() {
        bail!("dispatch.target_path must name a bucket or directory");
    }

    if !SUPPORTED_SCHEMES.contains(&config.source_scheme.as_str()) {
        bail!(
            "dispatch.source_scheme '{}' is not supported. Supported: {}",
            config.source_scheme,
            SUPPORTED_SCHEMES.join(", ")
        );
    }

    Ok(())
}

fn validate_transform_config(config: &TransformConfig) -> Result<()> {
    if config.parquet_row_group_size == 0 {
        bail!("transform.parquet_row_group_size must be greater than 0");
    }

    if config.parquet_row_group_size > 10_000_000 {
        warn!(
            parquet_row_group_size = config.parquet_row_group_size,
            "transform.parquet_row_group_size is very large; may cause memory issues"
        );
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<()> {
    if config.region.is_empty() {
        bail!("storage.region must not be empty");
    }

    if let Some(endpoint) = &config.endpoint {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            bail!("storage.endpoint must start with http:// or https://");
        }
    }

    Ok(())
}
