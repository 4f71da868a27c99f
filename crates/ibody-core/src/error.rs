//! Error types for the performance system

use thiserror::Error;

/// Core errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IbodyError {
    // Store errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid store path: {0}")]
    InvalidPath(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Environment errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for IbodyError {
    fn from(e: serde_json::Error) -> Self {
        IbodyError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for IbodyError {
    fn from(e: std::io::Error) -> Self {
        IbodyError::Io(e.to_string())
    }
}

/// Result type for performance operations
pub type IbodyResult<T> = Result<T, IbodyError>;
