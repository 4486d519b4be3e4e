//! Telemetry error types.

use configure::ConfigError;
use thiserror::Error;

/// Errors that can occur while setting up logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Invalid logging configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error reading the configuration store.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TelemetryError {
    /// Create an invalid configuration error for `key`.
    pub fn invalid_config(key: &str, message: impl std::fmt::Display) -> Self {
        Self::InvalidConfig(format!("{key}: {message}"))
    }
}
