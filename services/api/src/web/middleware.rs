//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::state::AppState;

/// Middleware that validates the bearer credential and resolves the acting user.
///
/// If valid, inserts the `User` into request extensions for handlers to use.
/// If the header is missing, the credential is bad, or its user is gone, the
/// request is rejected before reaching the handler.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the Authorization header; a non-UTF-8 value counts as missing.
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    // 2. Validate the credential and load its user
    let user = state.guard.authenticate(authorization).await?;

    // 3. Insert the user into request extensions
    req.extensions_mut().insert(user);

    // 4. Continue to the handler
    Ok(next.run(req).await)
}
