//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file extension is not one of yaml, yml, toml or json
    #[error("unsupported config format for {path}")]
    UnsupportedFormat {
        /// Offending file
        path: PathBuf,
    },

    /// The file contents could not be parsed
    #[error("failed to parse {format} config: {message}")]
    Parse {
        /// Format that was being parsed
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// An environment override holds an unusable value
    #[error("invalid value for {var}: {message}")]
    InvalidEnv {
        /// Variable name
        var: String,
        /// What is wrong with it
        message: String,
    },

    /// The assembled configuration violates a rule
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl ConfigError {
    pub(crate) fn invalid_env(var: &str, message: impl Into<String>) -> Self {
        Self::InvalidEnv {
            var: var.to_string(),
            message: message.into(),
        }
    }
}

impl From<ConfigError> for gateway_core::GatewayError {
    fn from(err: ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}
