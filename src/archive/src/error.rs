//! Error types for archiving and retention

use thiserror::Error;
use warden_core::CoreError;
use warden_vault::VaultError;

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Source directory or artifact missing
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bundling or unpacking failed
    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Archive too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    /// Sealing, opening or key custody failed
    #[error("Encryption error: {0}")]
    Encryption(#[from] VaultError),

    /// Encryption requested but no key custodian is configured
    #[error("Key custodian unavailable: {0}")]
    KeyUnavailable(String),

    #[error("Invalid archive name: {0}")]
    InvalidName(String),

    /// Metadata store failure
    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<CoreError> for ArchiveError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Configuration(msg) => ArchiveError::Configuration(msg),
            CoreError::NotFound(msg) => ArchiveError::NotFound(msg),
            CoreError::Io(e) => ArchiveError::Io(e),
        }
    }
}

impl From<tokio::task::JoinError> for ArchiveError {
    fn from(err: tokio::task::JoinError) -> Self {
        ArchiveError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Blocking task failed: {}", err),
        ))
    }
}
