//! Configuration module for Stratus
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`STRATUS_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use stratus::config::StratusConfig;
//!
//! // Load defaults
//! let config = StratusConfig::default();
//! assert_eq!(config.reaper.max_attempts, 3);
//!
//! // Parse from TOML
//! let toml = r#"
//! [reaper]
//! max_attempts = 5
//! "#;
//! let config: StratusConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.reaper.max_attempts, 5);
//! ```

pub mod error;
pub mod executor;
pub mod logging;
pub mod polling;
pub mod reaper;

pub use error::ConfigError;
pub use executor::ExecutorConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use polling::{PollingConfig, TimeoutsConfig};
pub use reaper::ReaperConfig;

use crate::poll::PolicyError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration.
///
/// # Example
///
/// ```rust
/// use stratus::config::StratusConfig;
///
/// let config = StratusConfig::default();
/// assert_eq!(config.timeouts.node_terminated_ms, 30_000);
/// assert_eq!(config.executor.user_threads, 8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StratusConfig {
    /// Default policy for ad-hoc polls
    pub polling: PollingConfig,
    /// Node and image transition budgets
    pub timeouts: TimeoutsConfig,
    /// Incidental resource cleanup
    pub reaper: ReaperConfig,
    /// Concurrency limits
    pub executor: ExecutorConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl StratusConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                Ok(toml::from_str(&content)?)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports STRATUS_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        // Logging settings
        if let Ok(level) = std::env::var("STRATUS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("STRATUS_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        // Reaper settings
        if let Ok(enabled) = std::env::var("STRATUS_REAPER_ENABLED") {
            self.reaper.enabled = enabled.to_lowercase() == "true";
        }
        if let Ok(attempts) = std::env::var("STRATUS_REAPER_MAX_ATTEMPTS") {
            if let Ok(n) = attempts.parse() {
                self.reaper.max_attempts = n;
            }
        }

        // Executor
        if let Ok(threads) = std::env::var("STRATUS_USER_THREADS") {
            if let Ok(n) = threads.parse() {
                self.executor.user_threads = n;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_policy("polling", self.polling.retry_policy().map(drop))?;
        check_policy("timeouts.node_running_ms", self.timeouts.node_running().map(drop))?;
        check_policy(
            "timeouts.node_terminated_ms",
            self.timeouts.node_terminated().map(drop),
        )?;
        check_policy(
            "timeouts.node_suspended_ms",
            self.timeouts.node_suspended().map(drop),
        )?;
        check_policy(
            "timeouts.image_available_ms",
            self.timeouts.image_available().map(drop),
        )?;
        check_policy("reaper", self.reaper.retry_policy().map(drop))?;

        if self.reaper.max_concurrent_groups == 0 {
            return Err(ConfigError::Validation {
                field: "reaper.max_concurrent_groups".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.reaper.name_prefix.is_empty() {
            return Err(ConfigError::Validation {
                field: "reaper.name_prefix".to_string(),
                message: "prefix cannot be empty".to_string(),
            });
        }
        if self.reaper.delimiter.is_alphanumeric() {
            return Err(ConfigError::Validation {
                field: "reaper.delimiter".to_string(),
                message: format!(
                    "'{}' would be ambiguous inside resource names",
                    self.reaper.delimiter
                ),
            });
        }
        if self.executor.user_threads == 0 {
            return Err(ConfigError::Validation {
                field: "executor.user_threads".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn check_policy(field: &str, result: Result<(), PolicyError>) -> Result<(), ConfigError> {
    result.map_err(|e| ConfigError::Validation {
        field: field.to_string(),
        message: e.to_string(),
    })
}
