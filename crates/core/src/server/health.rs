//! Liveness, readiness and metrics endpoints.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use sqlx::PgPool;

use super::metrics::render_metrics;

/// Liveness health check endpoint.
///
/// Returns `{"status":"ok"}` if the server is running. Does not check dependencies.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity; 503 Service Unavailable if the pool
/// cannot run `SELECT 1`.
///
/// Works with any router state that exposes a `PgPool` through `FromRef`.
pub async fn readiness(State(pool): State<PgPool>) -> Response {
    match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => Json(json!({ "status": "ready" })).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
                .into_response()
        }
    }
}

/// Prometheus scrape endpoint.
pub async fn metrics_endpoint() -> Response {
    render_metrics().map_or_else(
        || StatusCode::NOT_FOUND.into_response(),
        |body| {
            (
                [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
                .into_response()
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;

    #[tokio::test]
    async fn test_health_is_ok() {
        let Json(body) = health().await;
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_readiness_unavailable_without_database() {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();

        let response = readiness(State(pool)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
