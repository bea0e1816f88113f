//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the snippet REST endpoints and the master
//! definition for the OpenAPI specification.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snippedia_core::{
    Comment, DomainError, Reaction, ReactionKind, Snippet, SnippetDraft, User,
};
use std::sync::Arc;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    IntoParams, Modify, OpenApi, ToSchema,
};
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::web::auth::{self, ProfileResponse};
use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::github_callback_handler,
        auth::get_profile_handler,
        auth::update_profile_handler,
        list_snippets_handler,
        create_snippet_handler,
        get_snippet_handler,
        update_snippet_handler,
        delete_snippet_handler,
        reaction_handler,
        bookmark_handler,
        remove_bookmark_handler,
        bookmarks_handler,
        comment_handler,
        create_comment_handler,
        update_comment_handler,
        delete_comment_handler,
        user_snippets_handler,
        user_bookmarks_handler,
    ),
    components(
        schemas(
            SnippetRequest, SnippetResponse, CommentRequest, CommentResponse,
            ReactionResponse, BookmarkResponse, SuccessResponse, ProfileResponse, ErrorBody
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Snippedia API", description = "Share code snippets, react to them, bookmark and discuss them.")
    )
)]
pub struct ApiDoc;

/// Registers the bearer scheme referenced by the protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SnippetRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub code: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CommentRequest {
    pub content: String,
    /// Id of the comment being replied to. Empty or absent for a top-level comment.
    #[serde(rename = "parentId", default)]
    pub parent_id: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReactionParams {
    /// One of `useful`, `smart`, `refactored`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ReactionResponse {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<Reaction> for ReactionResponse {
    fn from(reaction: Reaction) -> Self {
        Self {
            user_id: reaction.user_id,
            kind: reaction.kind.to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CommentResponse {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub author_username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_reply: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            content: comment.content,
            author_id: comment.author_id,
            author_username: comment.author_username,
            avatar_url: comment.avatar_url,
            github_url: comment.github_url,
            created_at: comment.created_at,
            is_reply: comment.is_reply,
            parent_id: comment.parent_id,
        }
    }
}

/// A snippet, with its author's current details when the author still exists.
#[derive(Serialize, ToSchema)]
pub struct SnippetResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub code: String,
    pub language: String,
    pub tags: Vec<String>,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub useful: i64,
    pub smart: i64,
    pub refactored: i64,
    pub bookmarked_by: Vec<Uuid>,
    pub comments: Vec<CommentResponse>,
    pub reactions: Vec<ReactionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_github: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_bio: Option<String>,
}

impl From<Snippet> for SnippetResponse {
    fn from(snippet: Snippet) -> Self {
        Self {
            id: snippet.id,
            title: snippet.title,
            description: snippet.description,
            code: snippet.code,
            language: snippet.language,
            tags: snippet.tags,
            author_id: snippet.author_id,
            created_at: snippet.created_at,
            updated_at: snippet.updated_at,
            useful: snippet.useful,
            smart: snippet.smart,
            refactored: snippet.refactored,
            bookmarked_by: snippet.bookmarked_by,
            comments: snippet.comments.into_iter().map(CommentResponse::from).collect(),
            reactions: snippet.reactions.into_iter().map(ReactionResponse::from).collect(),
            author_username: None,
            author_avatar: None,
            author_github: None,
            author_bio: None,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct BookmarkResponse {
    pub bookmarked: bool,
}

#[derive(Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Attaches the author's details to a snippet for display.
async fn with_author(state: &AppState, snippet: Snippet) -> Result<SnippetResponse, ApiError> {
    let author = state.engine.author_summary(snippet.author_id).await?;
    let mut response = SnippetResponse::from(snippet);
    if let Some(author) = author {
        response.author_username = Some(author.username);
        response.author_avatar = Some(author.avatar_url);
        response.author_github = Some(author.github_url);
        response.author_bio = Some(author.bio);
    }
    Ok(response)
}

async fn with_authors(
    state: &AppState,
    snippets: Vec<Snippet>,
) -> Result<Vec<SnippetResponse>, ApiError> {
    let mut responses = Vec::with_capacity(snippets.len());
    for snippet in snippets {
        responses.push(with_author(state, snippet).await?);
    }
    Ok(responses)
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    DomainError::InvalidInput(rejection.body_text()).into()
}

//=========================================================================================
// Snippet Handlers
//=========================================================================================

/// List all snippets, newest first.
#[utoipa::path(
    get,
    path = "/api/snippets",
    responses(
        (status = 200, description = "All snippets", body = [SnippetResponse]),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn list_snippets_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SnippetResponse>>, ApiError> {
    let snippets = state.engine.list_snippets().await?;
    Ok(Json(with_authors(&state, snippets).await?))
}

/// Publish a snippet owned by the authenticated user.
#[utoipa::path(
    post,
    path = "/api/snippets",
    request_body = SnippetRequest,
    responses(
        (status = 201, description = "Snippet created", body = SnippetResponse),
        (status = 400, description = "Missing title or code", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn create_snippet_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    body: Result<Json<SnippetRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(invalid_body)?;
    let draft = SnippetDraft {
        title: req.title,
        description: req.description,
        code: req.code,
        language: req.language,
        tags: req.tags,
    };

    let snippet = state.engine.create_snippet(&user, draft).await?;
    Ok((StatusCode::CREATED, Json(SnippetResponse::from(snippet))))
}

/// Fetch one snippet with its comments and reactions.
#[utoipa::path(
    get,
    path = "/api/snippets/{id}",
    params(("id" = String, Path, description = "Snippet id")),
    responses(
        (status = 200, description = "The snippet", body = SnippetResponse),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "Snippet not found", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn get_snippet_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SnippetResponse>, ApiError> {
    let snippet = state.engine.get_snippet(&id).await?;
    Ok(Json(with_author(&state, snippet).await?))
}

/// Editing snippets is not implemented yet.
#[utoipa::path(
    put,
    path = "/api/snippets/{id}",
    params(("id" = String, Path, description = "Snippet id")),
    responses((status = 501, description = "Not implemented", body = ErrorBody)),
    security(("bearer" = []))
)]
pub async fn update_snippet_handler() -> ApiError {
    ApiError::NotImplemented
}

/// Delete a snippet. Only its author may do this.
#[utoipa::path(
    delete,
    path = "/api/snippets/{id}",
    params(("id" = String, Path, description = "Snippet id")),
    responses(
        (status = 200, description = "Snippet deleted", body = SuccessResponse),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Snippet not found", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn delete_snippet_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.engine.delete_snippet(&id, &user).await?;
    Ok(Json(SuccessResponse { success: true }))
}

//=========================================================================================
// Interaction Handlers
//=========================================================================================

/// Set the authenticated user's reaction. Repeating the same reaction changes nothing.
#[utoipa::path(
    post,
    path = "/api/snippets/{id}/reaction",
    params(("id" = String, Path, description = "Snippet id"), ReactionParams),
    responses(
        (status = 200, description = "Reaction recorded", body = SuccessResponse),
        (status = 400, description = "Unknown reaction type or malformed id", body = ErrorBody),
        (status = 404, description = "Snippet not found", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn reaction_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Query(params): Query<ReactionParams>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let kind: ReactionKind = params.kind.unwrap_or_default().parse()?;
    state.engine.set_reaction(&id, &user, kind).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// Toggle the authenticated user's bookmark and report the resulting state.
#[utoipa::path(
    post,
    path = "/api/snippets/{id}/bookmark",
    params(("id" = String, Path, description = "Snippet id")),
    responses(
        (status = 200, description = "Bookmark toggled", body = BookmarkResponse),
        (status = 404, description = "Snippet not found", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn bookmark_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<BookmarkResponse>, ApiError> {
    let bookmarked = state.engine.toggle_bookmark(&id, &user).await?;
    Ok(Json(BookmarkResponse { bookmarked }))
}

/// Removing a bookmark outside the toggle is not implemented yet.
#[utoipa::path(
    delete,
    path = "/api/snippets/{id}/bookmark",
    params(("id" = String, Path, description = "Snippet id")),
    responses((status = 501, description = "Not implemented", body = ErrorBody)),
    security(("bearer" = []))
)]
pub async fn remove_bookmark_handler() -> ApiError {
    ApiError::NotImplemented
}

/// Not implemented yet; `GET /api/user/bookmarks` serves the acting user's bookmarks.
#[utoipa::path(
    get,
    path = "/api/bookmarks",
    responses((status = 501, description = "Not implemented", body = ErrorBody)),
    security(("bearer" = []))
)]
pub async fn bookmarks_handler() -> ApiError {
    ApiError::NotImplemented
}

/// Add a comment, or a reply when `parentId` is given.
#[utoipa::path(
    post,
    path = "/api/snippets/{id}/comment",
    params(("id" = String, Path, description = "Snippet id")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "The stored comment", body = CommentResponse),
        (status = 400, description = "Empty content or malformed id", body = ErrorBody),
        (status = 404, description = "Snippet not found", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn comment_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    body: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<Json<CommentResponse>, ApiError> {
    let Json(req) = body.map_err(invalid_body)?;
    let comment = state
        .engine
        .add_comment(&id, &user, &req.content, req.parent_id.as_deref())
        .await?;
    Ok(Json(CommentResponse::from(comment)))
}

/// Not implemented yet; comments are added through `POST /api/snippets/{id}/comment`.
#[utoipa::path(
    post,
    path = "/api/snippets/{id}/comments",
    params(("id" = String, Path, description = "Snippet id")),
    responses((status = 501, description = "Not implemented", body = ErrorBody)),
    security(("bearer" = []))
)]
pub async fn create_comment_handler() -> ApiError {
    ApiError::NotImplemented
}

/// Editing comments is not implemented yet.
#[utoipa::path(
    put,
    path = "/api/snippets/{id}/comments/{comment_id}",
    params(
        ("id" = String, Path, description = "Snippet id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses((status = 501, description = "Not implemented", body = ErrorBody)),
    security(("bearer" = []))
)]
pub async fn update_comment_handler() -> ApiError {
    ApiError::NotImplemented
}

/// Deleting comments is not implemented yet.
#[utoipa::path(
    delete,
    path = "/api/snippets/{id}/comments/{comment_id}",
    params(
        ("id" = String, Path, description = "Snippet id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses((status = 501, description = "Not implemented", body = ErrorBody)),
    security(("bearer" = []))
)]
pub async fn delete_comment_handler() -> ApiError {
    ApiError::NotImplemented
}

//=========================================================================================
// The Acting User's Collections
//=========================================================================================

/// Snippets written by the authenticated user.
#[utoipa::path(
    get,
    path = "/api/user/snippets",
    responses((status = 200, description = "Own snippets", body = [SnippetResponse])),
    security(("bearer" = []))
)]
pub async fn user_snippets_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<SnippetResponse>>, ApiError> {
    let snippets = state.engine.list_authored_by(&user).await?;
    Ok(Json(with_authors(&state, snippets).await?))
}

/// Snippets the authenticated user has bookmarked.
#[utoipa::path(
    get,
    path = "/api/user/bookmarks",
    responses((status = 200, description = "Bookmarked snippets", body = [SnippetResponse])),
    security(("bearer" = []))
)]
pub async fn user_bookmarks_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<SnippetResponse>>, ApiError> {
    let snippets = state.engine.list_bookmarked_by(&user).await?;
    Ok(Json(snippets.into_iter().map(SnippetResponse::from).collect()))
}
