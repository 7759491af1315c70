// evetl-config - Unified configuration for the dispatcher and the transform job
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from EVETL_CONFIG env var
// 3. Config file contents from EVETL_CONFIG_CONTENT env var
// 4. Default config file location (./evetl.toml)
// 5. Platform-specific defaults (lowest priority)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

mod env_overrides;
mod layer;
mod logging;
mod platform;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};
pub use layer::ConfigLayer;
pub use logging::init_tracing;
pub use platform::Platform;

pub const DEFAULT_JOB_NAME: &str = "ev-station-etl-job";
pub const DEFAULT_TARGET_PATH: &str = "s3://ev-processed-data-curated/processed_sessions/";

/// Main runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub transform: TransformConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// What the dispatcher submits for each upload event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Orchestration-service job to start
    pub job_name: String,
    /// Destination passed to every run
    pub target_path: String,
    /// Scheme used when building the source location from an event
    #[serde(default = "default_source_scheme")]
    pub source_scheme: String,
}

fn default_source_scheme() -> String {
    "s3".to_string()
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            job_name: DEFAULT_JOB_NAME.to_string(),
            target_path: DEFAULT_TARGET_PATH.to_string(),
            source_scheme: default_source_scheme(),
        }
    }
}

/// Transform job settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default = "default_parquet_row_group_size")]
    pub parquet_row_group_size: usize,
    /// Skip sources already committed by an earlier run of the same job
    #[serde(default)]
    pub skip_processed_sources: bool,
}

fn default_parquet_row_group_size() -> usize {
    32 * 1024
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            parquet_row_group_size: default_parquet_row_group_size(),
            skip_processed_sources: false,
        }
    }
}

/// Object-storage connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub region: String,
    /// Custom S3-compatible endpoint (e.g. MinIO)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from all sources for the detected platform
    pub fn load() -> Result<Self> {
        sources::load_config(Platform::detect())
    }

    /// Construct a config that contains only platform defaults (no env or files).
    pub fn from_platform_defaults(platform: Platform) -> Self {
        platform_defaults(platform)
    }

    /// Overlay a parsed TOML layer field by field.
    pub fn merge(&mut self, layer: ConfigLayer) {
        layer.apply_to(self);
    }

    /// Apply environment overrides from a custom source.
    pub fn apply_env_overrides_from<E: EnvSource>(&mut self, env: &E) -> Result<()> {
        env_overrides::apply_env_overrides(self, env)
    }

    /// Build a configuration for the given platform from inline TOML plus
    /// overrides supplied by an `EnvSource`, without touching the host.
    pub fn load_for_platform_with_env<E: EnvSource>(
        platform: Platform,
        inline_config: Option<&str>,
        env: &E,
    ) -> Result<Self> {
        let mut config = RuntimeConfig::from_platform_defaults(platform);

        if let Some(inline) = inline_config {
            let layer =
                ConfigLayer::from_toml(inline).context("Failed to parse inline config content")?;
            config.merge(layer);
        }

        config.apply_env_overrides_from(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

fn platform_defaults(platform: Platform) -> RuntimeConfig {
    let defaults = platform.defaults();

    RuntimeConfig {
        dispatch: DispatchConfig::default(),
        transform: TransformConfig::default(),
        storage: StorageConfig::default(),
        logging: LoggingConfig {
            level: "info".to_string(),
            format: defaults.log_format,
        },
    }
}
