use super::{LogFormat, RuntimeConfig};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "EVETL_";

/// Abstraction over environment-variable lookups so tests and embedding
/// runtimes can supply their own source of overrides.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the EVETL_ prefix
    /// Used for AWS standard variables (AWS_REGION, etc.)
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Dispatch configuration
    if let Some(job_name) = get_env_string(env, "JOB_NAME")? {
        config.dispatch.job_name = job_name;
    }
    if let Some(target_path) = get_env_string(env, "TARGET_PATH")? {
        config.dispatch.target_path = target_path;
    }
    if let Some(scheme) = get_env_string(env, "SOURCE_SCHEME")? {
        config.dispatch.source_scheme = scheme.to_lowercase();
    }

    // Transform configuration
    if let Some(val) = get_env_usize(env, "PARQUET_ROW_GROUP_SIZE")? {
        config.transform.parquet_row_group_size = val;
    }
    if let Some(val) = get_env_bool(env, "SKIP_PROCESSED_SOURCES")? {
        config.transform.skip_processed_sources = val;
    }

    // Storage; AWS_REGION is set by every AWS runtime
    if let Some(region) = get_raw_env_string(env, "AWS_REGION")? {
        config.storage.region = region;
    }
    if let Some(region) = get_env_string(env, "S3_REGION")? {
        config.storage.region = region;
    }
    if let Some(endpoint) = get_env_string(env, "S3_ENDPOINT")? {
        config.storage.endpoint = Some(endpoint);
    }

    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL")? {
        config.logging.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT")? {
        config.logging.format = format
            .parse::<LogFormat>()
            .context("Invalid EVETL_LOG_FORMAT value")?;
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Result<Option<String>> {
    Ok(env.get(key).filter(|v| !v.is_empty()))
}

/// Get a raw environment variable without the EVETL_ prefix
fn get_raw_env_string<E: EnvSource>(env: &E, key: &str) -> Result<Option<String>> {
    Ok(env.get_raw(key).filter(|v| !v.is_empty()))
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    match get_env_string(env, key)? {
        Some(val) => {
            let parsed = val
                .parse::<usize>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_bool<E: EnvSource>(env: &E, key: &str) -> Result<Option<bool>> {
    match get_env_string(env, key)? {
        Some(val) => {
            let parsed = val.parse::<bool>().map_err(|e| {
                anyhow!(
                    "Failed to parse {}{} (expected bool): {}",
                    ENV_PREFIX,
                    key,
                    e
                )
            })?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Platform;
    use std::collections::HashMap;

    struct MapEnv(HashMap<&'static str, &'static str>);

    impl EnvSource for MapEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.0
                .get(format!("{}{}", ENV_PREFIX, key).as_str())
                .map(|v| v.to_string())
        }

        fn get_raw(&self, key: &str) -> Option<String> {
            self.0.get(key).map(|v| v.to_string())
        }
    }

    #[test]
    fn overrides_replace_defaults() {
        let env = MapEnv(HashMap::from([
            ("EVETL_JOB_NAME", "nightly-etl"),
            ("EVETL_TARGET_PATH", "s3://other/processed/"),
            ("EVETL_PARQUET_ROW_GROUP_SIZE", "1024"),
            ("EVETL_SKIP_PROCESSED_SOURCES", "true"),
            ("EVETL_LOG_FORMAT", "json"),
            ("EVETL_S3_ENDPOINT", "http://localhost:9000"),
        ]));
        let mut config = RuntimeConfig::from_platform_defaults(Platform::Batch);
        apply_env_overrides(&mut config, &env).unwrap();

        assert_eq!(config.dispatch.job_name, "nightly-etl");
        assert_eq!(config.dispatch.target_path, "s3://other/processed/");
        assert_eq!(config.transform.parquet_row_group_size, 1024);
        assert!(config.transform.skip_processed_sources);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.storage.endpoint.as_deref(),
            Some("http://localhost:9000")
        );
    }

    #[test]
    fn prefixed_region_wins_over_aws_region() {
        let env = MapEnv(HashMap::from([
            ("AWS_REGION", "eu-west-1"),
            ("EVETL_S3_REGION", "eu-central-1"),
        ]));
        let mut config = RuntimeConfig::from_platform_defaults(Platform::Batch);
        apply_env_overrides(&mut config, &env).unwrap();
        assert_eq!(config.storage.region, "eu-central-1");

        let env = MapEnv(HashMap::from([("AWS_REGION", "eu-west-1")]));
        let mut config = RuntimeConfig::from_platform_defaults(Platform::Batch);
        apply_env_overrides(&mut config, &env).unwrap();
        assert_eq!(config.storage.region, "eu-west-1");
    }

    #[test]
    fn malformed_values_are_errors() {
        let env = MapEnv(HashMap::from([("EVETL_SKIP_PROCESSED_SOURCES", "yes")]));
        let mut config = RuntimeConfig::from_platform_defaults(Platform::Batch);
        assert!(apply_env_overrides(&mut config, &env).is_err());

        let env = MapEnv(HashMap::from([("EVETL_PARQUET_ROW_GROUP_SIZE", "-1")]));
        let mut config = RuntimeConfig::from_platform_defaults(Platform::Batch);
        assert!(apply_env_overrides(&mut config, &env).is_err());
    }
}
