//! Error types for storage access and Parquet writing.

use thiserror::Error;

/// Errors that can occur while reading sources or writing the dataset
#[derive(Debug, Error)]
pub enum StorageError {
    /// A location string could not be parsed
    #[error("Invalid storage location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },

    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Reading or listing source objects failed
    #[error("Read operation failed: {message}")]
    ReadFailure { message: String },

    /// Write operation failed
    #[error("Write operation failed: {message}")]
    WriteFailure { message: String },

    /// A batch could not be split into partitions
    #[error("Partitioning failed: {message}")]
    Partition { message: String },

    /// Parquet encoding failed
    #[error("Parquet encoding failed: {0}")]
    Encode(#[from] parquet::errors::ParquetError),
}

impl StorageError {
    pub fn invalid_location(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLocation {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config(message: String) -> Self {
        Self::InvalidConfig { message }
    }

    pub fn read_failure(message: String) -> Self {
        Self::ReadFailure { message }
    }

    pub fn write_failure(message: String) -> Self {
        Self::WriteFailure { message }
    }

    pub fn partition(message: String) -> Self {
        Self::Partition { message }
    }
}

/// Result type alias for StorageError
pub type Result<T> = std::result::Result<T, StorageError>;
