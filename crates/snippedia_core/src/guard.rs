//! crates/snippedia_core/src/guard.rs
//!
//! Resolves the bearer credential of a request to the acting user.

use std::sync::Arc;
use tracing::debug;

use crate::domain::User;
use crate::error::{DomainError, DomainResult};
use crate::ports::UserStore;
use crate::session::SessionIssuer;

#[derive(Clone)]
pub struct AccessGuard {
    sessions: Arc<SessionIssuer>,
    users: Arc<dyn UserStore>,
}

impl AccessGuard {
    pub fn new(sessions: Arc<SessionIssuer>, users: Arc<dyn UserStore>) -> Self {
        Self { sessions, users }
    }

    /// Authenticates a request from the raw value of its `Authorization` header.
    ///
    /// The returned user belongs to this request only; callers must not cache it.
    pub async fn authenticate(&self, authorization: Option<&str>) -> DomainResult<User> {
        let token = bearer_token(authorization)?;
        let user_id = self.sessions.validate(token)?;

        let user = self
            .users
            .get_user_by_id(user_id)
            .await
            .map_err(|e| DomainError::from_store(e, DomainError::UserNotFound))?;
        debug!("Authenticated user {}", user.id);
        Ok(user)
    }
}

/// Extracts the credential from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(authorization: Option<&str>) -> DomainResult<&str> {
    let value = authorization.ok_or(DomainError::Unauthenticated)?.trim();
    let (scheme, token) = value
        .split_once(' ')
        .ok_or(DomainError::Unauthenticated)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(DomainError::Unauthenticated);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(DomainError::Unauthenticated);
    }
    Ok(token)
}
