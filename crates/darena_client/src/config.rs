//! Client configuration.

use std::path::Path;

use darena_core::layout::{DEFAULT_PLAYER_NAME, DEFAULT_PORT, DEFAULT_SERVER_HOST};
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

/// The scripted turn the autopilot plays every time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    /// Ticks to walk before aiming.
    pub walk_ticks: u32,
    /// Walk direction: -1 left, 1 right, 0 stay.
    pub walk_direction: i8,
    /// Ticks to hold the aim key.
    pub aim_ticks: u32,
    /// Aim direction: -1 lower, 1 raise, 0 keep.
    pub aim_direction: i8,
    /// Ticks to charge before releasing the shot.
    pub charge_ticks: u32,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            walk_ticks: 20,
            walk_direction: 1,
            aim_ticks: 5,
            aim_direction: -1,
            charge_ticks: 100,
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Name sent to the server.
    pub player_name: String,
    /// Server host.
    pub server_host: String,
    /// Server port.
    pub port: u16,
    /// Give up after this many frames; 0 plays until the match ends.
    pub max_frames: u64,
    /// Scripted turn.
    pub autopilot: AutopilotConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            player_name: DEFAULT_PLAYER_NAME.to_string(),
            server_host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_PORT,
            max_frames: 0,
            autopilot: AutopilotConfig::default(),
        }
    }
}

impl ClientConfig {
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

    /// Reject values the client cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.player_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "player_name",
                reason: "must not be empty".to_string(),
            });
        }
        for (field, value) in [
            ("autopilot.walk_direction", self.autopilot.walk_direction),
            ("autopilot.aim_direction", self.autopilot.aim_direction),
        ] {
            if !(-1..=1).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} is not one of -1, 0, 1"),
                });
            }
        }
        Ok(())
    }

    /// `host:port` of the server.
    #[must_use]
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.player_name, "Player");
        assert_eq!(config.server_addr(), "127.0.0.1:50325");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_nested_autopilot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "(player_name: \"ada\", autopilot: (walk_ticks: 3, charge_ticks: 40))"
        )
        .unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.player_name, "ada");
        assert_eq!(config.autopilot.walk_ticks, 3);
        assert_eq!(config.autopilot.charge_ticks, 40);
        assert_eq!(config.autopilot.aim_ticks, 5);
        assert_eq!(config.port, 50325);
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = ClientConfig {
            player_name: "  ".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "player_name", .. })
        ));

        let mut config = ClientConfig::default();
        config.autopilot.walk_direction = 2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "autopilot.walk_direction", .. })
        ));
    }
}
