//! Alerting Error Types

use thiserror::Error;

/// Invalid alert configuration. Raised at construction, never at runtime.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidThreshold { field: &'static str, value: f64 },

    #[error("{field} of {value_ms} ms is out of range")]
    DurationOutOfRange { field: &'static str, value_ms: u64 },
}

/// Log sink delivery failures
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sink channel closed")]
    ChannelClosed,
}

/// Actuation sink failures
#[derive(Debug, Clone, Error)]
pub enum ActuationError {
    #[error("Actuator unavailable: {0}")]
    Unavailable(String),
}
