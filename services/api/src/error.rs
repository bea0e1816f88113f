//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered as an HTTP response.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use snippedia_core::DomainError;
use tracing::{error, warn};
use utoipa::ToSchema;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A failure reported by one of the core components.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request was well-formed but asks for something this service does not do yet.
    #[error("Not implemented")]
    NotImplemented,

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The JSON body returned for every failed request.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(e) => match e {
                DomainError::Upstream(_) => StatusCode::BAD_GATEWAY,
                DomainError::InvalidGrant
                | DomainError::InvalidToken
                | DomainError::Expired
                | DomainError::Unauthenticated => StatusCode::UNAUTHORIZED,
                DomainError::DuplicateAccount => StatusCode::CONFLICT,
                DomainError::SnippetNotFound | DomainError::UserNotFound => StatusCode::NOT_FOUND,
                DomainError::InvalidIdentifier(_) | DomainError::InvalidInput(_) => {
                    StatusCode::BAD_REQUEST
                }
                DomainError::Forbidden => StatusCode::FORBIDDEN,
                DomainError::Store(_) | DomainError::Signing(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal details stay in the log; the client gets a generic message.
        let message = if status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED {
            error!("Request failed: {}", self);
            match self {
                ApiError::Domain(DomainError::Upstream(_)) => {
                    "Failed to reach the identity provider".to_string()
                }
                _ => "Internal server error".to_string(),
            }
        } else {
            warn!("Request rejected with {}: {}", status, self);
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
