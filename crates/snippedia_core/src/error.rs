//! crates/snippedia_core/src/error.rs
//!
//! The error taxonomy surfaced by the core components to their callers.

use crate::ports::PortError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// The identity provider was unreachable or answered with something unusable.
    #[error("Identity provider error: {0}")]
    Upstream(String),
    #[error("The authorization code was rejected by the identity provider")]
    InvalidGrant,
    #[error("Invalid session token")]
    InvalidToken,
    #[error("Session token has expired")]
    Expired,
    #[error("Missing or malformed Authorization header")]
    Unauthenticated,
    /// Lost a concurrent first-login race; the caller should look the account up again.
    #[error("An account for this identity was created concurrently")]
    DuplicateAccount,
    #[error("Store error: {0}")]
    Store(String),
    #[error("Snippet not found")]
    SnippetNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("You are not the author of this snippet")]
    Forbidden,
    #[error("Invalid request: {0}")]
    InvalidInput(String),
    #[error("Failed to sign session token: {0}")]
    Signing(String),
}

/// A convenience type alias for `Result<T, DomainError>`.
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Maps a store failure, turning `NotFound` into the given kind.
    pub(crate) fn from_store(err: PortError, not_found: DomainError) -> Self {
        match err {
            PortError::NotFound(_) => not_found,
            other => DomainError::Store(other.to_string()),
        }
    }
}
