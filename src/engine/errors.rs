//! # Engine Errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid JSON for the expected shape
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Config parsed but is inconsistent
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "RP_CONFIG_READ",
            ConfigError::Json(_) => "RP_CONFIG_JSON",
            ConfigError::Invalid(_) => "RP_CONFIG_INVALID",
        }
    }
}
