//! services/api/src/web/auth.rs
//!
//! The GitHub login callback and the acting user's profile endpoints.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use snippedia_core::{DomainError, User};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    /// The authorization code GitHub appended to the redirect.
    pub code: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar_url: String,
    pub bio: String,
    pub github_url: String,
    pub badges: Vec<String>,
    pub bookmarked_ids: Vec<Uuid>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            avatar_url: user.avatar_url,
            bio: user.bio,
            github_url: user.github_url,
            badges: user.badges,
            bookmarked_ids: user.bookmarked_ids,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /auth/github/callback - Complete the GitHub login
///
/// Exchanges the code, upserts the account and redirects to the frontend with
/// the session credential in the `token` query parameter.
#[utoipa::path(
    get,
    path = "/auth/github/callback",
    params(CallbackParams),
    responses(
        (status = 303, description = "Redirect to the frontend carrying the session token"),
        (status = 400, description = "Missing code", body = ErrorBody),
        (status = 401, description = "Code rejected by GitHub", body = ErrorBody),
        (status = 502, description = "GitHub unreachable", body = ErrorBody)
    )
)]
pub async fn github_callback_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, ApiError> {
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| DomainError::InvalidInput("Code is required".to_string()))?;

    let outcome = state.login.complete(&code).await?;
    info!("Redirecting user {} to the frontend", outcome.user.id);

    Ok(Redirect::to(&format!(
        "{}/?token={}",
        state.config.frontend_url, outcome.token
    )))
}

/// GET /api/user/profile - The authenticated user's profile
#[utoipa::path(
    get,
    path = "/api/user/profile",
    responses(
        (status = 200, description = "Profile of the acting user", body = ProfileResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn get_profile_handler(Extension(user): Extension<User>) -> Json<ProfileResponse> {
    Json(ProfileResponse::from(user))
}

/// PUT /api/user/profile - Not implemented yet
#[utoipa::path(
    put,
    path = "/api/user/profile",
    responses((status = 501, description = "Not implemented", body = ErrorBody)),
    security(("bearer" = []))
)]
pub async fn update_profile_handler() -> ApiError {
    ApiError::NotImplemented
}
