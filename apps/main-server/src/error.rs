//! Server error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Message for JSON endpoints called without a session.
pub const LOGIN_REQUIRED_MESSAGE: &str = "Login required";

const INTERNAL_MESSAGE: &str = "Something went wrong";

/// Server error type.
///
/// Rendered as `{"error": message}` with the matching status.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Invalid request parameters.
    #[error("{0}")]
    InvalidRequest(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Authentication required.
    #[error("Login required")]
    AuthenticationRequired,

    /// Permission denied.
    #[error("{0}")]
    PermissionDenied(String),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] location_store::StoreError),

    /// Session or credential error.
    #[error("Auth error: {0}")]
    Auth(#[from] auth::AuthError),

    /// Internal server error with a user-facing message.
    #[error("{0}")]
    Internal(String),
}

impl ServerError {
    /// Returns the status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            ServerError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ServerError::Store(_) | ServerError::Auth(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the message safe to show to users.
    pub fn message(&self) -> String {
        match self {
            ServerError::Store(_) | ServerError::Auth(_) => INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
