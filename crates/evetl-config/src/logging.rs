// Logging/tracing setup shared by the dispatcher and the transform job

use crate::{LogFormat, LoggingConfig};

/// Initialize tracing from the logging section; repeated calls are no-ops.
pub fn init_tracing(logging: &LoggingConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Ignore the error if a subscriber is already installed
    let _ = match logging.format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))
        }
        LogFormat::Text => tracing::subscriber::set_global_default(registry.with(fmt::layer())),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_is_harmless() {
        let logging = LoggingConfig {
            level: "not a filter[".to_string(),
            format: LogFormat::Json,
        };
        init_tracing(&logging);
        init_tracing(&LoggingConfig::default());
        tracing::info!("still logging");
    }
}
