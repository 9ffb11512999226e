//! Configuration module for Roomcast.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, RoomError};

/// Room configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomConfig {
    /// Bound of the room's intake queue.
    #[serde(default = "default_intake_capacity")]
    pub intake_capacity: usize,
    /// Bound of each member's mailbox. Lines for a full mailbox are dropped.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    /// Maximum chat message length (in characters).
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Maximum member name length (in characters).
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

fn default_intake_capacity() -> usize {
    256
}

fn default_mailbox_capacity() -> usize {
    100
}

fn default_max_message_length() -> usize {
    1000
}

fn default_max_name_length() -> usize {
    32
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            intake_capacity: default_intake_capacity(),
            mailbox_capacity: default_mailbox_capacity(),
            max_message_length: default_max_message_length(),
            max_name_length: default_max_name_length(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/roomcast.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Room configuration.
    #[serde(default)]
    pub room: RoomConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(RoomError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration, falling back to defaults if the file cannot be
    /// read or parsed. Environment overrides apply either way; the load
    /// error, if any, is handed back for reporting.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> (Self, Option<RoomError>) {
        let (mut config, err) = match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        };
        config.apply_env_overrides();
        (config, err)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| RoomError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `ROOMCAST_LOG_LEVEL`: Override the log level
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("ROOMCAST_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if any queue bound or length limit is zero.
    pub fn validate(&self) -> Result<()> {
        let room = &self.room;
        let limits = [
            ("room.intake_capacity", room.intake_capacity),
            ("room.mailbox_capacity", room.mailbox_capacity),
            ("room.max_message_length", room.max_message_length),
            ("room.max_name_length", room.max_name_length),
        ];
        for (key, value) in limits {
            if value == 0 {
                return Err(RoomError::Config(format!("{key} must be greater than 0")));
            }
        }
        Ok(())
    }
}
