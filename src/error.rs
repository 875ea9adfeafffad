//! Error types for the Tokengate service.

use thiserror::Error;

/// Main error type for Tokengate operations.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for GatewayError {
    fn from(err: config::ConfigError) -> Self {
        GatewayError::Config(err.to_string())
    }
}

/// Result type alias for Tokengate operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
