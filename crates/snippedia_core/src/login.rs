//! crates/snippedia_core/src/login.rs
//!
//! The provider login: code exchange, profile fetch, account upsert and
//! session issuance.

use std::sync::Arc;
use tracing::{info, warn};

use crate::accounts::AccountResolver;
use crate::domain::{RemoteProfile, User};
use crate::error::{DomainError, DomainResult};
use crate::ports::{IdentityProvider, PortError};
use crate::session::SessionIssuer;

/// A completed login: the local account and a fresh session credential for it.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct LoginFlow {
    provider: Arc<dyn IdentityProvider>,
    accounts: AccountResolver,
    sessions: Arc<SessionIssuer>,
}

impl LoginFlow {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        accounts: AccountResolver,
        sessions: Arc<SessionIssuer>,
    ) -> Self {
        Self {
            provider,
            accounts,
            sessions,
        }
    }

    pub async fn exchange_code(&self, code: &str) -> DomainResult<String> {
        self.provider
            .exchange_code(code)
            .await
            .map_err(|e| match e {
                PortError::Unauthorized => DomainError::InvalidGrant,
                other => DomainError::Upstream(other.to_string()),
            })
    }

    pub async fn fetch_profile(&self, access_token: &str) -> DomainResult<RemoteProfile> {
        self.provider
            .fetch_profile(access_token)
            .await
            .map_err(|e| DomainError::Upstream(e.to_string()))
    }

    /// Runs the whole login for an authorization code.
    ///
    /// Losing a first-login race is resolved by looking the account up once more;
    /// by then the winning insert is visible.
    pub async fn complete(&self, code: &str) -> DomainResult<LoginOutcome> {
        let access_token = self.exchange_code(code).await?;
        let profile = self.fetch_profile(&access_token).await?;

        let user = match self.accounts.resolve_or_create(&profile).await {
            Err(DomainError::DuplicateAccount) => {
                warn!("Retrying account resolution for provider account {}", profile.id);
                self.accounts.resolve_or_create(&profile).await?
            }
            other => other?,
        };

        let token = self.sessions.issue(user.id)?;
        info!("User {} ({}) logged in", user.id, user.username);
        Ok(LoginOutcome { user, token })
    }
}
