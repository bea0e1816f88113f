//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use snippedia_core::ports::{IdentityProvider, SnippetStore, UserStore};
use snippedia_core::{AccessGuard, AccountResolver, InteractionEngine, LoginFlow, SessionIssuer};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// The stores behind the components are the process-wide database pool; nothing
/// request-specific lives here.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub login: LoginFlow,
    pub guard: AccessGuard,
    pub engine: InteractionEngine,
}

impl AppState {
    /// Wires the core components onto the given adapters.
    pub fn new(
        config: Arc<Config>,
        users: Arc<dyn UserStore>,
        snippets: Arc<dyn SnippetStore>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let sessions = Arc::new(SessionIssuer::new(
            config.jwt_secret.as_bytes().to_vec(),
            config.jwt_expiration,
        ));

        Self {
            login: LoginFlow::new(provider, AccountResolver::new(users.clone()), sessions.clone()),
            guard: AccessGuard::new(sessions, users.clone()),
            engine: InteractionEngine::new(snippets, users),
            config,
        }
    }
}
