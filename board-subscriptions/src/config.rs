//! Engine configuration.
//!
//! Configuration is loaded from environment variables with defaults suitable
//! for local development and tests.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Environment variable holding the maximum number of queries per batch.
pub const ENV_MAX_QUERY_BATCH: &str = "BOARD_MAX_QUERY_BATCH";

/// Environment variable holding the change feed buffer size.
pub const ENV_CHANGE_CHANNEL_CAPACITY: &str = "BOARD_CHANGE_CHANNEL_CAPACITY";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Configuration of the subscription service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionConfig {
    /// Maximum number of resolution queries accepted in one batch.
    pub max_batch_size: usize,

    /// Number of change notifications buffered per listener before the
    /// slowest listener starts missing them.
    pub change_channel_capacity: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 32,
            change_channel_capacity: 1024,
        }
    }
}

impl SubscriptionConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `BOARD_MAX_QUERY_BATCH`: Maximum queries per batch (default: 32)
    /// - `BOARD_CHANGE_CHANNEL_CAPACITY`: Change feed buffer size (default: 1024)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let config = Self {
            max_batch_size: parse_var(&lookup, ENV_MAX_QUERY_BATCH)?
                .unwrap_or(default.max_batch_size),
            change_channel_capacity: parse_var(&lookup, ENV_CHANGE_CHANNEL_CAPACITY)?
                .unwrap_or(default.change_channel_capacity),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: ENV_MAX_QUERY_BATCH.to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.change_channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: ENV_CHANGE_CHANNEL_CAPACITY.to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
    }
}
