//! Configuration error types.

use thiserror::Error;

/// Errors raised while building or validating the daemon configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value failed validation (out-of-range worker count, bad protocol
    /// mode name, etc).
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
