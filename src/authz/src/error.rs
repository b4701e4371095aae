//! Error types for the authorization engine

use thiserror::Error;

/// Authorization engine errors
///
/// A denied permission check is a [`Decision`](crate::Decision), never an error.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Malformed rule definition
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// A rule already exists for the same resource/operation pair
    #[error("Rule conflict: {0}")]
    RuleConflict(String),

    /// The rule table no longer accepts changes
    #[error("Rule table is frozen")]
    RulesFrozen,

    /// Caller may not perform an administrative action
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed grant request
    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    /// An active grant already exists for the same key
    #[error("Grant conflict: {0}")]
    GrantConflict(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
