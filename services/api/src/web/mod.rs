pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use state::AppState;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use auth::{get_profile_handler, github_callback_handler, update_profile_handler};
use rest::{
    bookmark_handler, bookmarks_handler, comment_handler, create_comment_handler,
    create_snippet_handler, delete_comment_handler, delete_snippet_handler, get_snippet_handler,
    list_snippets_handler, reaction_handler, remove_bookmark_handler, update_comment_handler,
    update_snippet_handler, user_bookmarks_handler, user_snippets_handler,
};

/// GET /health - Liveness probe
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the CORS policy from the configured origin list.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(_) if origin == "*" => {
                warn!("Ignoring wildcard CORS origin; credentialed requests need explicit origins");
                None
            }
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([ORIGIN, AUTHORIZATION, CONTENT_TYPE, ACCEPT])
}

/// Creates the complete web router (without the Swagger UI).
pub fn router(app_state: Arc<AppState>) -> Router {
    let auth_layer = axum_middleware::from_fn_with_state(app_state.clone(), require_auth);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/github/callback", get(github_callback_handler))
        // Listing is public, publishing needs a session.
        .route(
            "/api/snippets",
            get(list_snippets_handler)
                .merge(post(create_snippet_handler).route_layer(auth_layer.clone())),
        );

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/api/user/profile",
            get(get_profile_handler).put(update_profile_handler),
        )
        .route("/api/user/snippets", get(user_snippets_handler))
        .route("/api/user/bookmarks", get(user_bookmarks_handler))
        .route("/api/bookmarks", get(bookmarks_handler))
        .route(
            "/api/snippets/{id}",
            get(get_snippet_handler)
                .put(update_snippet_handler)
                .delete(delete_snippet_handler),
        )
        .route("/api/snippets/{id}/reaction", post(reaction_handler))
        .route(
            "/api/snippets/{id}/bookmark",
            post(bookmark_handler).delete(remove_bookmark_handler),
        )
        .route("/api/snippets/{id}/comment", post(comment_handler))
        .route("/api/snippets/{id}/comments", post(create_comment_handler))
        .route(
            "/api/snippets/{id}/comments/{comment_id}",
            put(update_comment_handler).delete(delete_comment_handler),
        )
        .route_layer(auth_layer);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors_layer(&app_state.config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
