//! Custom error types for the users service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::models::UserId;

/// Errors raised by the user store and directory
#[derive(Error, Debug)]
pub enum UserError {
    /// Another user already holds this email (compared case-insensitively)
    #[error("User email already exists: {0}")]
    DuplicateEmail(String),

    /// No user with this id
    #[error("User not found: {0}")]
    NotFound(UserId),

    /// Role name outside the supported role set
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// Storage failure
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Type alias for user operation results
pub type UserResult<T> = Result<T, UserError>;

/// Error type returned by HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    #[error(transparent)]
    User(#[from] UserError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            ApiError::User(err @ (UserError::DuplicateEmail(_) | UserError::InvalidRole(_))) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::User(err @ UserError::NotFound(_)) => (StatusCode::NOT_FOUND, err.to_string()),
            ApiError::User(UserError::Database(e)) => {
                error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_user_errors_map_to_status_codes() {
        assert_eq!(
            status_of(UserError::DuplicateEmail("a@example.org".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(UserError::InvalidRole("USER".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(UserError::NotFound(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(UserError::Database(DatabaseError::Migration(
                "boom".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ApiError::BadRequest("nope".to_string())),
            StatusCode::BAD_REQUEST
        );
    }
}
