// Partial configuration read from TOML
//
// Every field is optional so a file only overrides what it names. Anything
// left out keeps the value from the layer below (platform defaults).

use serde::Deserialize;

use crate::{LogFormat, RuntimeConfig};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub dispatch: DispatchLayer,
    pub transform: TransformLayer,
    pub storage: StorageLayer,
    pub logging: LoggingLayer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchLayer {
    pub job_name: Option<String>,
    pub target_path: Option<String>,
    pub source_scheme: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformLayer {
    pub parquet_row_group_size: Option<usize>,
    pub skip_processed_sources: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageLayer {
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingLayer {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

impl ConfigLayer {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Overwrite only the fields this layer sets.
    pub fn apply_to(self, config: &mut RuntimeConfig) {
        set(&mut config.dispatch.job_name, self.dispatch.job_name);
        set(&mut config.dispatch.target_path, self.dispatch.target_path);
        set(&mut config.dispatch.source_scheme, self.dispatch.source_scheme);

        set(
            &mut config.transform.parquet_row_group_size,
            self.transform.parquet_row_group_size,
        );
        set(
            &mut config.transform.skip_processed_sources,
            self.transform.skip_processed_sources,
        );

        set(&mut config.storage.region, self.storage.region);
        if self.storage.endpoint.is_some() {
            config.storage.endpoint = self.storage.endpoint;
        }

        set(&mut config.logging.level, self.logging.level);
        set(&mut config.logging.format, self.logging.format);
    }
}
