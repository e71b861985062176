//! Configuration management for tabtether

use crate::{Error, Result};
use serde::Deserialize;
use std::env;

/// Control-plane configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Number of connection attempts before giving up
    pub connect_attempts: u32,

    /// Base timeout for the first connection attempt (milliseconds)
    pub connect_timeout_base_ms: u64,

    /// Timeout increment added per attempt (milliseconds)
    pub connect_timeout_increment_ms: u64,

    /// Base backoff delay between attempts (milliseconds)
    pub backoff_base_ms: u64,

    /// Backoff increment added per attempt (milliseconds)
    pub backoff_increment_ms: u64,

    /// Default timeout for locator-based actions (milliseconds)
    pub action_timeout_ms: u64,

    /// Directory for persisted action recordings
    pub recordings_dir: String,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect_attempts: 3,
            connect_timeout_base_ms: 5000,
            connect_timeout_increment_ms: 5000,
            backoff_base_ms: 200,
            backoff_increment_ms: 300,
            action_timeout_ms: 5000,
            recordings_dir: "recordings".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(attempts) = env::var("TABTETHER_CONNECT_ATTEMPTS") {
            config.connect_attempts = attempts
                .parse()
                .map_err(|_| Error::configuration("Invalid TABTETHER_CONNECT_ATTEMPTS"))?;
        }

        if let Ok(timeout) = env::var("TABTETHER_CONNECT_TIMEOUT_MS") {
            config.connect_timeout_base_ms = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid TABTETHER_CONNECT_TIMEOUT_MS"))?;
        }

        if let Ok(increment) = env::var("TABTETHER_CONNECT_TIMEOUT_INCREMENT_MS") {
            config.connect_timeout_increment_ms = increment.parse().map_err(|_| {
                Error::configuration("Invalid TABTETHER_CONNECT_TIMEOUT_INCREMENT_MS")
            })?;
        }

        if let Ok(backoff) = env::var("TABTETHER_BACKOFF_MS") {
            config.backoff_base_ms = backoff
                .parse()
                .map_err(|_| Error::configuration("Invalid TABTETHER_BACKOFF_MS"))?;
        }

        if let Ok(increment) = env::var("TABTETHER_BACKOFF_INCREMENT_MS") {
            config.backoff_increment_ms = increment
                .parse()
                .map_err(|_| Error::configuration("Invalid TABTETHER_BACKOFF_INCREMENT_MS"))?;
        }

        if let Ok(timeout) = env::var("TABTETHER_ACTION_TIMEOUT_MS") {
            config.action_timeout_ms = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid TABTETHER_ACTION_TIMEOUT_MS"))?;
        }

        if let Ok(dir) = env::var("TABTETHER_RECORDINGS_DIR") {
            config.recordings_dir = dir;
        }

        if let Ok(log_level) = env::var("TABTETHER_LOG_LEVEL") {
            config.log_level = log_level;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }
}
