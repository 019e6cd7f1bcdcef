//! Server configuration.
//!
//! Loaded from an optional RON file; command-line flags override
//! individual fields in `main`.

use std::path::Path;

use darena_core::layout::{CONNECTION_AWAIT_MS, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read file.
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse RON file.
    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        /// Path to the file.
        path: String,
        /// Underlying parse error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// A value is out of range.
    #[error("Invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Seed for terrain generation; drawn from entropy when unset.
    pub seed: Option<u64>,
    /// How often the lobby reports that it is still waiting, in milliseconds.
    pub accept_poll_ms: u64,
    /// How long a new connection may take to introduce itself, in milliseconds.
    pub handshake_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            seed: None,
            accept_poll_ms: CONNECTION_AWAIT_MS,
            handshake_timeout_ms: 5_000,
        }
    }
}

impl ServerConfig {
    /// Load a configuration from a RON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let path_str = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path_str.clone(),
            source: e,
        })?;
        let config: Self = ron::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path_str,
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accept_poll_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "accept_poll_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.handshake_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "handshake_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// `host:port` to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
