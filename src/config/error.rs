//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file {0} does not exist")]
    NotFound(PathBuf),

    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but cannot be used, e.g. a timeout shorter than its interval
    #[error("invalid value for '{field}': {message}")]
    Validation { field: String, message: String },
}
