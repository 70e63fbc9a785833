//! Process-wide logging setup.
//!
//! Library code logs through the `log` macros and opens `tracing` spans around
//! save stages. [`init`] installs a `tracing-subscriber` fmt subscriber and
//! bridges `log` records into it with `tracing_log::LogTracer`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::ConfigError;

const VALID_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

fn build_env_filter(level: &str) -> Result<EnvFilter, ConfigError> {
    if !VALID_LEVELS.contains(&level) {
        return Err(ConfigError::Validation {
            message: format!(
                "Invalid log level '{}'. Must be one of: {}",
                level,
                VALID_LEVELS.join(", ")
            ),
        });
    }

    // RUST_LOG wins over the configured level when set.
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directives = format!("{},rusqlite=warn", level);
    EnvFilter::try_new(&directives).map_err(|e| ConfigError::Validation {
        message: format!("Invalid tracing filter '{}': {}", directives, e),
    })
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init(level: &str, format: LogFormat) -> Result<(), ConfigError> {
    let filter = build_env_filter(level)?;

    let fmt_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(fmt_layer).with(filter);

    tracing::subscriber::set_global_default(subscriber).map_err(|e| ConfigError::Validation {
        message: format!("Failed to install tracing subscriber: {}", e),
    })?;

    tracing_log::LogTracer::init().map_err(|e| ConfigError::Validation {
        message: format!("Failed to bridge log records: {}", e),
    })?;

    log::debug!("Logging initialized: level={}, format={:?}", level, format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("JSONL"), LogFormat::Json);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Compact);
    }

    #[test]
    fn test_invalid_level_rejected() {
        assert!(matches!(
            build_env_filter("verbose"),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_init_only_once() {
        assert!(init("debug", LogFormat::Compact).is_ok());
        assert!(init("debug", LogFormat::Compact).is_err());
    }
}
