//! # Error Types
//!
//! Custom error types for the telemetry relay using `thiserror`.

use thiserror::Error;

/// Main error type for the telemetry relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// Required identity or endpoint setting missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file is not valid TOML
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Source endpoint could not be reached or answered with an error status
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Status document is malformed, incomplete or non-numeric
    #[error("Parse error: {0}")]
    Parse(String),

    /// Destination endpoint unreachable or returned a non-success status
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Telemetry event could not be serialized
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl RelayError {
    /// Returns true for the configuration class of errors
    pub fn is_config(&self) -> bool {
        matches!(self, RelayError::Config(_) | RelayError::ConfigParse(_))
    }
}

/// Result type alias for the telemetry relay
pub type Result<T> = std::result::Result<T, RelayError>;
