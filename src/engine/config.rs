//! Engine configuration
//!
//! A JSON file holding the default primary key, an optional default schema
//! and the model descriptors. Every field has a default, so `{}` is a valid
//! configuration.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::observability::{log_event, Event, Severity};
use crate::schema::ModelDescriptor;

use super::errors::{ConfigError, ConfigResult};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Primary key used when neither the model nor the request names one
    #[serde(default = "default_primary_key")]
    pub default_primary_key: String,

    /// Schema used for cache tags of unqualified tables
    #[serde(default)]
    pub default_schema: Option<String>,

    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_primary_key: default_primary_key(),
            default_schema: None,
            models: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_json(&content)?;

        let shown = path.display().to_string();
        let models = config.models.len().to_string();
        log_event(
            Severity::Info,
            Event::ConfigLoaded,
            &[("path", shown.as_str()), ("models", models.as_str())],
        );
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_primary_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_primary_key must not be empty".into(),
            ));
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.table_name.trim().is_empty() {
                return Err(ConfigError::Invalid("model table_name must not be empty".into()));
            }
            if model.primary_key.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "model '{}' has an empty primary_key",
                    model.table_name
                )));
            }
            if !seen.insert(model.bare_table().to_ascii_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "model '{}' is declared twice",
                    model.table_name
                )));
            }
            for relation in &model.relations {
                if relation.field_name.trim().is_empty() || relation.target_table.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "model '{}' has a relation without field_name or target_table",
                        model.table_name
                    )));
                }
            }
        }

        Ok(())
    }
}
