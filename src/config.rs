//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::analysis::AnalysisSettings;
use crate::batch::BatchConfig;
use crate::client::ClientConfig;
use crate::service::ServiceConfig;
use crate::session::DEFAULT_HISTORY_CAPACITY;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub batch: BatchSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote sentiment API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub url: String,

    /// `0` disables the timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Defaults for single analyses and explanations
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_language() -> String {
    "auto".to_string()
}

fn default_threshold() -> f64 {
    0.5
}

fn default_top_n() -> usize {
    10
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            threshold: default_threshold(),
            top_n: default_top_n(),
        }
    }
}

/// Session history configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
        }
    }
}

/// Batch run configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSection {
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Falls back to `[analysis] language` when unset
    pub language: Option<String>,
}

fn default_max_rows() -> usize {
    1000
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
            language: None,
        }
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
    "warn".to_string()
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

        config.validate(path)?;
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
        for path in Self::default_paths() {
            if path.exists() {
                match Self::load_with_env(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Config file locations, in lookup order
    pub fn default_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("sentilens").join("config.toml")),
            Some(PathBuf::from("./sentilens.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // API overrides
        if let Some(url) = var("SENTILENS_API_URL") {
            self.api.url = url;
        }
        if let Some(timeout) = var("SENTILENS_TIMEOUT_SECS") {
            match timeout.parse() {
                Ok(secs) => self.api.request_timeout_secs = secs,
                Err(_) => {
                    tracing::warn!(value = %timeout, "Ignoring invalid SENTILENS_TIMEOUT_SECS")
                }
            }
        }

        // Analysis overrides
        if let Some(language) = var("SENTILENS_LANGUAGE") {
            self.analysis.language = language;
        }

        // Logging overrides
        if let Some(level) = var("SENTILENS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("SENTILENS_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let invalid = |error: String| ConfigError::Invalid {
            path: path.to_path_buf(),
            error,
        };

        if !(0.0..=1.0).contains(&self.analysis.threshold) {
            return Err(invalid(format!(
                "analysis.threshold must be between 0 and 1, got {}",
                self.analysis.threshold
            )));
        }
        if self.batch.max_rows == 0 {
            return Err(invalid("batch.max_rows must be at least 1".to_string()));
        }
        if !(1..=DEFAULT_HISTORY_CAPACITY).contains(&self.session.history_capacity) {
            return Err(invalid(format!(
                "session.history_capacity must be between 1 and {}, got {}",
                DEFAULT_HISTORY_CAPACITY, self.session.history_capacity
            )));
        }
        Ok(())
    }

    /// HTTP client settings
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api.url.clone(),
            request_timeout_secs: self.api.request_timeout_secs,
        }
    }

    /// Service defaults
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            analysis: AnalysisSettings {
                language: self.analysis.language.clone(),
                threshold: self.analysis.threshold,
            },
            top_n: self.analysis.top_n,
            history_capacity: self.session.history_capacity,
            batch: BatchConfig {
                max_rows: self.batch.max_rows,
                language: self
                    .batch
                    .language
                    .clone()
                    .unwrap_or_else(|| self.analysis.language.clone()),
            },
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

    #[error("Invalid config file {path:?}: {error}")]
    Invalid { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Sentilens Configuration
#
# Environment variables override these settings:
# - SENTILENS_API_URL
# - SENTILENS_TIMEOUT_SECS
# - SENTILENS_LANGUAGE
# - SENTILENS_LOG_LEVEL
# - SENTILENS_LOG_FORMAT

[api]
# Sentiment service base URL
url = "http://localhost:8080"

# Request timeout in seconds (0 disables it)
request_timeout_secs = 60

[analysis]
# Language sent with each request: auto, es, en, ...
language = "auto"

# Classification threshold, between 0 and 1
threshold = 0.5

# Number of influential words requested by explain
top_n = 10

[session]
# Number of analyses kept in the history (1 to 10)
history_capacity = 10

[batch]
# Maximum number of texts per CSV file
max_rows = 1000

# Language for batch runs (defaults to analysis.language)
# language = "es"

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
