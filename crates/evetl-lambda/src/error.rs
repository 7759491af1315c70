use thiserror::Error;

/// Reasons a dispatch invocation fails
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Payload is not an S3 notification or lacks bucket/key
    #[error("Malformed S3 event: {0}")]
    MalformedEvent(String),

    /// Object key is not valid UTF-8 once percent-decoded
    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// The orchestration service rejected or failed the request
    #[error("Failed to start job run for '{job_name}': {message}")]
    Submission { job_name: String, message: String },
}

impl DispatchError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedEvent(message.into())
    }

    pub fn submission(job_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Submission {
            job_name: job_name.into(),
            message: message.into(),
        }
    }
}
