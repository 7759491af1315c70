// Platform detection based on environment variables
//
// - AWS Lambda: AWS_LAMBDA_FUNCTION_NAME present (the dispatcher)
// - Batch: anything else (the transform job or a local run)

use crate::LogFormat;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Lambda,
    Batch,
}

impl Platform {
    /// Auto-detect the current platform based on environment variables
    pub fn detect() -> Self {
        if env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
            Platform::Lambda
        } else {
            Platform::Batch
        }
    }

    /// Get platform-specific defaults
    pub fn defaults(&self) -> PlatformDefaults {
        match self {
            // CloudWatch indexes JSON lines
            Platform::Lambda => PlatformDefaults {
                log_format: LogFormat::Json,
            },
            Platform::Batch => PlatformDefaults {
                log_format: LogFormat::Text,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlatformDefaults {
    pub log_format: LogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_defaults() {
        assert_eq!(Platform::Lambda.defaults().log_format, LogFormat::Json);
        assert_eq!(Platform::Batch.defaults().log_format, LogFormat::Text);
    }
}
