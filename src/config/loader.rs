use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Config;

/// Errors that can occur when loading configuration.
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

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/calcpipe/config.toml` on Unix/macOS via
    /// `dirs::config_dir()`, falling back to the current directory.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("calcpipe").join("config.toml")
    }

    /// Loads configuration from the default config file.
    ///
    /// A missing file yields `Config::default()`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Config::default());
        }
        Self::load_from(&path)
    }

    /// Loads and validates configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.child.program.trim().is_empty() {
            return Err(invalid("child.program must not be empty"));
        }

        let protocol = &self.protocol;
        if protocol.sentinel.is_empty() {
            return Err(invalid("protocol.sentinel must not be empty"));
        }
        if !protocol.quit_command.ends_with('\n') {
            return Err(invalid("protocol.quit_command must end with a newline"));
        }
        if protocol.response_timeout_ms == 0 || protocol.startup_timeout_ms == 0 {
            return Err(invalid("protocol timeouts must be greater than zero"));
        }
        if protocol.read_chunk_bytes == 0 {
            return Err(invalid("protocol.read_chunk_bytes must be greater than zero"));
        }
        if protocol.max_response_bytes < protocol.sentinel.len() {
            return Err(invalid(
                "protocol.max_response_bytes must be at least the sentinel length",
            ));
        }

        let buffer = &self.buffer;
        if buffer.initial_capacity == 0 {
            return Err(invalid("buffer.initial_capacity must be greater than zero"));
        }
        if buffer.initial_capacity > buffer.max_capacity {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "buffer.initial_capacity ({}) exceeds buffer.max_capacity ({})",
                    buffer.initial_capacity, buffer.max_capacity
                ),
            });
        }

        if self.shutdown.grace_period_ms == 0 {
            return Err(invalid("shutdown.grace_period_ms must be greater than zero"));
        }
        if self.shutdown.poll_interval_ms == 0 {
            return Err(invalid("shutdown.poll_interval_ms must be greater than zero"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError {
        message: message.to_string(),
    }
}
