//! crates/snippedia_core/src/accounts.rs
//!
//! Maps a provider profile onto a local user, creating or refreshing it.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::{RemoteProfile, User};
use crate::error::{DomainError, DomainResult};
use crate::ports::{PortError, UserStore};

#[derive(Clone)]
pub struct AccountResolver {
    users: Arc<dyn UserStore>,
}

impl AccountResolver {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Upserts the local user for `profile`, keyed by the provider id.
    ///
    /// Uniqueness is enforced by the store. If another request creates the same
    /// account between our lookup and our insert, this fails with
    /// `DuplicateAccount` and the caller is expected to resolve again.
    pub async fn resolve_or_create(&self, profile: &RemoteProfile) -> DomainResult<User> {
        let now = Utc::now();

        match self.users.get_user_by_github_id(profile.id).await {
            Ok(existing) => {
                self.users
                    .update_user_profile(existing.id, profile, now)
                    .await
                    .map_err(|e| DomainError::from_store(e, DomainError::UserNotFound))?;
                debug!("Refreshed profile for user {} ({})", existing.id, profile.login);

                Ok(User {
                    username: profile.login.clone(),
                    email: profile.email.clone(),
                    avatar_url: profile.avatar_url.clone(),
                    bio: profile.bio.clone(),
                    github_url: profile.html_url.clone(),
                    updated_at: now,
                    ..existing
                })
            }
            Err(PortError::NotFound(_)) => match self.users.insert_user(profile, now).await {
                Ok(user) => {
                    info!("Created user {} for provider account {}", user.id, profile.id);
                    Ok(user)
                }
                Err(PortError::Conflict(msg)) => {
                    warn!(
                        "Concurrent first login for provider account {}: {}",
                        profile.id, msg
                    );
                    Err(DomainError::DuplicateAccount)
                }
                Err(e) => Err(DomainError::Store(e.to_string())),
            },
            Err(e) => Err(DomainError::Store(e.to_string())),
        }
    }
}
