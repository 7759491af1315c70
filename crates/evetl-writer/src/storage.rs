//! Storage operator construction.
//!
//! One OpenDAL operator per bucket (S3) or one rooted at `/` (local files).
//! Paths handed to the operator are `StorageLocation::path()` values.

use evetl_config::StorageConfig;
use opendal::Operator;

use crate::error::{Result, StorageError};
use crate::location::{Scheme, StorageLocation};

/// Builds operators for locations using shared storage settings.
#[derive(Debug, Clone)]
pub struct OperatorFactory {
    region: String,
    endpoint: Option<String>,
}

impl OperatorFactory {
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        }
    }

    /// Create an operator that can reach `location`.
    ///
    /// OpenDAL discovers AWS credentials on its own (IAM role, environment
    /// variables, credentials file).
    pub fn operator_for(&self, location: &StorageLocation) -> Result<Operator> {
        match location.scheme() {
            Scheme::S3 => {
                let mut s3_builder = opendal::services::S3::default()
                    .bucket(location.bucket())
                    .region(&self.region);

                if let Some(endpoint) = &self.endpoint {
                    s3_builder = s3_builder.endpoint(endpoint);
                }

                let operator = Operator::new(s3_builder)
                    .map_err(|e| {
                        StorageError::invalid_config(format!(
                            "Failed to create S3 operator for bucket '{}': {}",
                            location.bucket(),
                            e
                        ))
                    })?
                    .finish();

                tracing::debug!(
                    bucket = location.bucket(),
                    region = %self.region,
                    "S3 operator initialized"
                );
                Ok(operator)
            }
            Scheme::File => {
                let fs_builder = opendal::services::Fs::default().root("/");
                let operator = Operator::new(fs_builder)
                    .map_err(|e| {
                        StorageError::invalid_config(format!(
                            "Failed to create filesystem operator: {}",
                            e
                        ))
                    })?
                    .finish();

                tracing::debug!("Filesystem operator initialized");
                Ok(operator)
            }
        }
    }
}
