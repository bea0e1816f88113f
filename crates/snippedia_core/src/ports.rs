//! crates/snippedia_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete document store and identity provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Comment, Reaction, ReactionKind, RemoteProfile, Snippet, SnippetDraft, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Store Ports
//=========================================================================================
// Every mutating method is one atomic update of a single user or snippet document.
// Methods that address a document by id return `PortError::NotFound` when it is gone.
//=========================================================================================

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_by_github_id(&self, github_id: i64) -> PortResult<User>;

    /// Inserts a new user built from `profile` and returns it with its store-assigned id.
    /// Fails with `PortError::Conflict` if a user with the same provider id already exists.
    async fn insert_user(&self, profile: &RemoteProfile, now: DateTime<Utc>) -> PortResult<User>;

    /// Overwrites the profile-derived fields. The id and creation time are left alone.
    async fn update_user_profile(
        &self,
        user_id: Uuid,
        profile: &RemoteProfile,
        now: DateTime<Utc>,
    ) -> PortResult<()>;
}

#[async_trait]
pub trait SnippetStore: Send + Sync {
    // --- Snippet Documents ---
    async fn create_snippet(
        &self,
        author_id: Uuid,
        draft: SnippetDraft,
        now: DateTime<Utc>,
    ) -> PortResult<Snippet>;

    async fn get_snippet(&self, snippet_id: Uuid) -> PortResult<Snippet>;

    /// All snippets, newest first.
    async fn list_snippets(&self) -> PortResult<Vec<Snippet>>;

    async fn list_snippets_by_author(&self, author_id: Uuid) -> PortResult<Vec<Snippet>>;

    async fn list_snippets_bookmarked_by(&self, user_id: Uuid) -> PortResult<Vec<Snippet>>;

    async fn delete_snippet(&self, snippet_id: Uuid) -> PortResult<()>;

    // --- Reactions ---
    /// Adds `delta` to the counter for `kind`, optionally refreshing `updated_at`.
    async fn increment_reaction(
        &self,
        snippet_id: Uuid,
        kind: ReactionKind,
        delta: i64,
        touched_at: Option<DateTime<Utc>>,
    ) -> PortResult<()>;

    /// Removes every embedded reaction belonging to `user_id`.
    async fn pull_reaction(&self, snippet_id: Uuid, user_id: Uuid) -> PortResult<()>;

    async fn push_reaction(&self, snippet_id: Uuid, reaction: Reaction) -> PortResult<()>;

    // --- Bookmarks ---
    /// Set-union: adding a user that is already present leaves the set unchanged.
    async fn add_bookmark(&self, snippet_id: Uuid, user_id: Uuid) -> PortResult<()>;

    /// Set-difference: removing an absent user is not an error.
    async fn remove_bookmark(&self, snippet_id: Uuid, user_id: Uuid) -> PortResult<()>;

    // --- Comments ---
    async fn push_comment(&self, snippet_id: Uuid, comment: Comment) -> PortResult<()>;
}

//=========================================================================================
// Identity Provider Port
//=========================================================================================

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchanges an authorization code for an access token.
    /// Returns `PortError::Unauthorized` when the provider answers without a usable token.
    async fn exchange_code(&self, code: &str) -> PortResult<String>;

    /// Fetches the profile of the account the access token belongs to.
    async fn fetch_profile(&self, access_token: &str) -> PortResult<RemoteProfile>;
}
