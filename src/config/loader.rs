use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::types::Settings;

/// Errors that can occur when loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Settings {
    /// Returns the path to the settings file.
    ///
    /// Uses `<config dir>/hyperstate/config.toml` via `dirs::config_dir()`,
    /// falling back to the current directory.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("hyperstate").join("config.toml")
    }

    /// Loads settings from the default path, or defaults if it is missing.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Settings::default());
        }
        Self::load_from(&path)
    }

    /// Loads and validates settings from `path`. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Checks:
    /// - the runtime label is not empty
    /// - `max_chain_depth`, when set, is at least 1
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runtime.label.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "runtime.label must not be empty".to_string(),
            });
        }

        if self.runtime.max_chain_depth == Some(0) {
            return Err(ConfigError::ValidationError {
                message: "runtime.max_chain_depth must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
