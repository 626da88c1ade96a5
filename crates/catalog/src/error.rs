//! Unified error handling for the catalog service.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use shopfloor_core::ApiResponse;

use crate::db::RepositoryError;

/// Application-level error type for the catalog service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// One or more fields failed validation.
    #[error("Validation failed")]
    Validation(Vec<String>),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Map `RepositoryError::NotFound` to a 404 naming `entity`.
    ///
    /// ```rust,ignore
    /// repo.update(id, &input).await.map_err(AppError::not_found("Product"))?;
    /// ```
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
            | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
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
                "Catalog request error"
            );
        }

        // Don't expose internal error details to clients
        let body = match self {
            Self::Validation(details) => ApiResponse::error_with_details("Validation failed", details),
            Self::Database(RepositoryError::NotFound) => ApiResponse::error("Not found"),
            Self::Database(RepositoryError::Conflict(message)) => ApiResponse::error(message),
            Self::Database(_) | Self::Internal(_) => ApiResponse::error("Internal server error"),
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
    fn test_app_error_display() {
        let err = AppError::NotFound("Product");
        assert_eq!(err.to_string(), "Product not found");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(AppError::NotFound("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Database(RepositoryError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Database(RepositoryError::Conflict("dup".to_owned())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Validation(vec![]).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Database(RepositoryError::DataCorruption("bad".to_owned())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Internal("test".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, json) = body_json(AppError::Database(RepositoryError::DataCorruption(
            "secret table layout".to_owned(),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_validation_lists_details() {
        let (status, json) = body_json(AppError::Validation(vec![
            "name is required".to_owned(),
            "base_price must not be negative".to_owned(),
        ]))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Validation failed");
        assert_eq!(json["details"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_conflict_message_is_reported() {
        let (status, json) =
            body_json(AppError::Database(RepositoryError::Conflict("sku already exists".to_owned())))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "sku already exists");
    }
}
