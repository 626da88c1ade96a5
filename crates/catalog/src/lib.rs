//! Shopfloor Catalog service library.
//!
//! Products, variants, images and categories over a JSON API. Reads are
//! public; writes require a staff or admin token issued by the users service.
//!
//! The router is exposed through [`app`] so it can be served by the binary
//! and driven directly by the integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;

use axum::{Router, routing::get};

use shopfloor_core::server::{health, metrics_endpoint, readiness, with_service_layers};

use crate::state::AppState;

/// Build the complete catalog application with all middleware.
pub fn app(state: AppState) -> Router {
    let cors_origins = state.config().cors_allowed_origins.clone();

    let router = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/metrics", get(metrics_endpoint))
        .merge(routes::public_routes())
        .merge(routes::staff_routes(&state))
        .with_state(state);

    with_service_layers(router, &cors_origins)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use secrecy::SecretString;
    use shopfloor_core::server::LogFormat;
    use shopfloor_core::{Email, UserId, UserRole};
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::config::CatalogConfig;

    const SECRET: &str = "k3y-Material-For-Tests-0123456789!";

    fn state() -> AppState {
        let config = CatalogConfig {
            database_url: SecretString::from("postgres://127.0.0.1:1/unreachable"),
            host: [127, 0, 0, 1].into(),
            port: 0,
            jwt_secret: SecretString::from(SECRET),
            jwt_issuer: "shopfloor".to_owned(),
            db_max_connections: 1,
            cors_allowed_origins: Vec::new(),
            log_format: LogFormat::Pretty,
            sentry_dsn: None,
            sentry_environment: None,
        };
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy("postgres://127.0.0.1:1/unreachable")
            .unwrap();
        AppState::new(config, pool)
    }

    fn bearer(role: UserRole) -> String {
        let keys = shopfloor_core::auth::TokenKeys::new(
            &SecretString::from(SECRET),
            "shopfloor",
            chrono::Duration::hours(1),
        );
        let email = Email::parse("someone@example.com").unwrap();
        format!("Bearer {}", keys.issue(UserId::new(3), &email, role).unwrap().token)
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app(state()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let (status, json) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_writes_require_token() {
        let request = Request::post("/products")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_customer_cannot_write() {
        let request = Request::delete("/categories/1")
            .header(header::AUTHORIZATION, bearer(UserRole::Customer))
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_bad_listing_parameters_are_reported_together() {
        let request = Request::get("/products?limit=0&min_price=abc")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Validation failed");
        assert_eq!(json["details"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_staff_create_is_validated_before_the_database() {
        let request = Request::post("/products")
            .header(header::AUTHORIZATION, bearer(UserRole::Staff))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"  ","base_price":"-1"}"#))
            .unwrap();
        let (status, json) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Validation failed");
    }
}
