//! Crate-level error type
//!
//! Only configuration errors are fatal. Sensor, connection, and publish
//! errors are contained where they happen and surfaced through logging;
//! this type exists for the start-up and shutdown paths that do propagate.

use thiserror::Error;

/// Main error type for station operations.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Sensor error: {0}")]
    Sensor(#[from] crate::sensors::SensorError),

    #[error("Transport error: {0}")]
    Transport(#[from] crate::transport::mqtt::MqttError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AgentError {
    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result type for station operations.
pub type AgentResult<T> = Result<T, AgentError>;
