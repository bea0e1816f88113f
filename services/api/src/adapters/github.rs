//! services/api/src/adapters/github.rs
//!
//! This module contains the adapter for GitHub's OAuth flow.
//! It implements the `IdentityProvider` port from the `core` crate.

use async_trait::async_trait;
use serde::Deserialize;
use snippedia_core::domain::RemoteProfile;
use snippedia_core::ports::{IdentityProvider, PortError, PortResult};
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("snippedia/", env!("CARGO_PKG_VERSION"));

//=========================================================================================
// Provider Response Payloads
//=========================================================================================

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// The subset of `GET /user` we keep. GitHub sends `null` for unset fields.
#[derive(Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    email: Option<String>,
    avatar_url: Option<String>,
    bio: Option<String>,
    html_url: Option<String>,
}
impl GitHubUser {
    fn to_domain(self) -> RemoteProfile {
        RemoteProfile {
            id: self.id,
            login: self.login,
            email: self.email.unwrap_or_default(),
            avatar_url: self.avatar_url.unwrap_or_default(),
            bio: self.bio.unwrap_or_default(),
            html_url: self.html_url.unwrap_or_default(),
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `IdentityProvider` port using GitHub OAuth apps.
#[derive(Clone)]
pub struct GitHubAdapter {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    api_url: String,
}

impl GitHubAdapter {
    /// Creates a new `GitHubAdapter`.
    pub fn new(
        client_id: String,
        client_secret: String,
        token_url: String,
        api_url: String,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            client_id,
            client_secret,
            token_url,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

//=========================================================================================
// `IdentityProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityProvider for GitHubAdapter {
    async fn exchange_code(&self, code: &str) -> PortResult<String> {
        let response = self
            .client
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Token request failed: {}", e)))?;

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to parse token response: {}", e)))?;

        match body.access_token.filter(|t| !t.is_empty()) {
            Some(token) => Ok(token),
            None => {
                warn!(
                    "GitHub returned no access token: {} {}",
                    body.error.unwrap_or_default(),
                    body.error_description.unwrap_or_default()
                );
                Err(PortError::Unauthorized)
            }
        }
    }

    async fn fetch_profile(&self, access_token: &str) -> PortResult<RemoteProfile> {
        let response = self
            .client
            .get(format!("{}/user", self.api_url))
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PortError::Unexpected(format!("Profile request failed: {}", e)))?;

        let user: GitHubUser = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to parse profile: {}", e)))?;
        debug!("Fetched GitHub profile {} ({})", user.login, user.id);
        Ok(user.to_domain())
    }
}
