//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::defaults::default_log_level;
use super::rate_limits::RateLimitConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Quotas, caps, delays, suspicion thresholds and cooldowns.
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
    /// Durable snapshot settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Durable snapshot configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the JSON snapshot. `None` keeps state in memory only.
    pub path: Option<String>,
    /// 0 (default) writes the snapshot before every mutating call returns.
    /// A positive value defers writes to a background flush every
    /// `flush_interval_ms`.
    #[serde(default)]
    pub flush_interval_ms: u64,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (default: "info").
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pacekeeper.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[rate_limits]
monthly_cap = 1500

[persistence]
path = "state.json"
flush_interval_ms = 250

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.rate_limits.monthly_cap, 1500);
        assert_eq!(config.persistence.path.as_deref(), Some("state.json"));
        assert_eq!(config.persistence.flush_interval_ms, 250);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/pacekeeper.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "rate_limits = [").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.persistence.path.is_none());
        assert_eq!(config.persistence.flush_interval_ms, 0);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }
}
