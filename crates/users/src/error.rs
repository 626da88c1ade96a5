//! Unified error handling for the users service.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use shopfloor_core::ApiResponse;

use crate::db::RepositoryError;
use crate::services::AuthError;

/// Application-level error type for the users service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// One or more fields failed validation.
    #[error("Validation failed")]
    Validation(Vec<String>),

    /// The token's subject is not a usable user id.
    #[error("Unauthorized")]
    Unauthorized,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Map `RepositoryError::NotFound` to a 404 naming `entity`.
    pub fn not_found(entity: &'static str) -> impl Fn(RepositoryError) -> Self {
        move |e| match e {
            RepositoryError::NotFound => Self::NotFound(entity),
            other => Self::Database(other),
        }
    }

    /// Status code this error is reported with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_))
            | Self::BadRequest(_)
            | Self::Validation(_)
            | Self::Auth(
                AuthError::InvalidEmail(_)
                | AuthError::UserAlreadyExists
                | AuthError::WeakPassword(_),
            ) => StatusCode::BAD_REQUEST,
            Self::Auth(AuthError::InvalidCredentials) | Self::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            Self::Database(_)
            | Self::Auth(AuthError::Token(_) | AuthError::Repository(_) | AuthError::PasswordHash)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Users request error"
            );
        }

        // Don't expose internal error details to clients
        let body = match self {
            Self::Validation(details) => ApiResponse::error_with_details("Validation failed", details),
            Self::Database(RepositoryError::NotFound) => ApiResponse::error("Not found"),
            Self::Database(RepositoryError::Conflict(message)) => ApiResponse::error(message),
            Self::Auth(AuthError::InvalidCredentials) => {
                ApiResponse::error("Invalid email or password")
            }
            Self::Auth(AuthError::UserAlreadyExists) => {
                ApiResponse::error("Email already registered")
            }
            Self::Auth(AuthError::InvalidEmail(e)) => ApiResponse::error(format!("Invalid email: {e}")),
            Self::Auth(AuthError::WeakPassword(reason)) => ApiResponse::error(reason),
            Self::Unauthorized => ApiResponse::error("Authentication required"),
            Self::Database(_) | Self::Auth(_) | Self::Internal(_) => {
                ApiResponse::error("Internal server error")
            }
            other => ApiResponse::error(other.to_string()),
        };

        (status, Json(body)).into_response()
    }
}

impl From<Vec<String>> for AppError {
    fn from(problems: Vec<String>) -> Self {
        Self::Validation(problems)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(
            AppError::Auth(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Auth(AuthError::UserAlreadyExists).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Auth(AuthError::WeakPassword("short".to_owned())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Auth(AuthError::PasswordHash).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("Address").status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_email_message() {
        let (status, json) = body_json(AppError::Auth(AuthError::UserAlreadyExists)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Email already registered");
    }

    #[tokio::test]
    async fn test_credentials_message_does_not_say_which_part_failed() {
        let (status, json) = body_json(AppError::Auth(AuthError::InvalidCredentials)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Invalid email or password");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, json) = body_json(AppError::Auth(AuthError::Repository(
            RepositoryError::DataCorruption("bad row".to_owned()),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Internal server error");
    }
}
