//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::query::StoreSchema;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Names of the metrics store objects queries are generated against
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_time_series_table")]
    pub time_series_table: String,

    #[serde(default = "default_samples_table")]
    pub samples_table: String,
}

fn default_database() -> String {
    "signoz_metrics".to_string()
}

fn default_time_series_table() -> String {
    "time_series_v2".to_string()
}

fn default_samples_table() -> String {
    "samples_v2".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            time_series_table: default_time_series_table(),
            samples_table: default_samples_table(),
        }
    }
}

impl StoreConfig {
    /// Schema for the query builder
    pub fn schema(&self) -> StoreSchema {
        StoreSchema::new(&self.database, &self.time_series_table, &self.samples_table)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("metrics-sql").join("config.toml")),
            Some(PathBuf::from("/etc/metrics-sql/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Store overrides
        if let Some(database) = lookup("METRICS_SQL_DATABASE") {
            self.store.database = database;
        }
        if let Some(table) = lookup("METRICS_SQL_TIME_SERIES_TABLE") {
            self.store.time_series_table = table;
        }
        if let Some(table) = lookup("METRICS_SQL_SAMPLES_TABLE") {
            self.store.samples_table = table;
        }

        // Logging overrides
        if let Some(level) = lookup("METRICS_SQL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("METRICS_SQL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# metrics-sql Configuration
#
# Environment variables override these settings:
# - METRICS_SQL_DATABASE
# - METRICS_SQL_TIME_SERIES_TABLE
# - METRICS_SQL_SAMPLES_TABLE
# - METRICS_SQL_LOG_LEVEL
# - METRICS_SQL_LOG_FORMAT

[store]
# Database holding the metrics tables
database = "signoz_metrics"

# Table with one row per fingerprint and its JSON label set
time_series_table = "time_series_v2"

# Table with one row per sample (fingerprint, timestamp_ms, value)
samples_table = "samples_v2"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
