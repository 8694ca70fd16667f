//! Runtime configuration (marionette.toml)

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Value out of range
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Top-level runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Deferred-call queue settings
    pub queue: QueueConfig,

    /// Object database settings
    pub objects: ObjectsConfig,

    /// Logging settings
    pub log: LogConfig,
}

/// `[queue]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum requests held between two pumps
    pub max_pending: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { max_pending: 8192 }
    }
}

/// `[objects]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObjectsConfig {
    /// Cap on simultaneously live objects; unlimited when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_objects: Option<usize>,
}

/// `[log]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Default `tracing` filter directive
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.max_pending == 0 {
            return Err(ConfigError::ValidationError(
                "queue.max_pending must be greater than zero".to_string(),
            ));
        }
        if self.objects.max_objects == Some(0) {
            return Err(ConfigError::ValidationError(
                "objects.max_objects must be greater than zero".to_string(),
            ));
        }
        if self.log.filter.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "log.filter must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
