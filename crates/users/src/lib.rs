//! Shopfloor Users service library.
//!
//! Registration and login with Argon2id password hashes and JWT access
//! tokens, the caller's profile and postal addresses, and an admin listing.
//! Tokens issued here are also accepted by the catalog service.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, routing::get};

use shopfloor_core::server::{health, metrics_endpoint, readiness, with_service_layers};

use crate::state::AppState;

/// Build the complete users application with all middleware.
pub fn app(state: AppState) -> Router {
    let cors_origins = state.config().cors_allowed_origins.clone();

    let router = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/metrics", get(metrics_endpoint))
        .merge(routes::public_routes())
        .merge(routes::account_routes(&state))
        .merge(routes::admin_routes(&state))
        .with_state(state);

    with_service_layers(router, &cors_origins)
}
