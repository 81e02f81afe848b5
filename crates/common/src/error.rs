//! Common error types for watchdog components.

use std::fmt;

/// A specialized Result type for watchdog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for watchdog operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Sink delivery error: {0}")]
    Sink(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Other(String),
}

impl Error {
    /// Create a new probe error.
    pub fn probe(msg: impl fmt::Display) -> Self {
        Error::Probe(msg.to_string())
    }

    /// Create a new sink delivery error.
    pub fn sink(msg: impl fmt::Display) -> Self {
        Error::Sink(msg.to_string())
    }

    /// Create a new configuration error.
    pub fn config(msg: impl fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new other error.
    pub fn other(msg: impl fmt::Display) -> Self {
        Error::Other(msg.to_string())
    }
}
