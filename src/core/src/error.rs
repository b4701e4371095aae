//! Shared error type for the Warden crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors shared across subsystems
#[derive(Debug, Error)]
pub enum CoreError {
    /// A backing service (store, keystore) is missing or misconfigured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        CoreError::Configuration(msg.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        CoreError::NotFound(msg.into())
    }
}
