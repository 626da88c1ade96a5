//! HTTP route handlers for the users service.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                  - Liveness check
//! GET    /health/ready            - Readiness check (database)
//! GET    /metrics                 - Prometheus metrics
//!
//! # Public
//! POST   /auth/register           - Create account, returns token
//! POST   /auth/login              - Email + password, returns token
//!
//! # Bearer token
//! GET    /profile                 - Current user
//! PUT    /profile                 - Update names/phone
//! DELETE /profile                 - Deactivate account
//! PUT    /profile/password        - Change password
//! GET    /profile/addresses       - Active addresses
//! POST   /profile/addresses       - Add address
//! PUT    /profile/addresses/{id}  - Update address
//! DELETE /profile/addresses/{id}  - Soft delete address
//!
//! # Admin
//! GET    /users                   - Paginated user listing
//! ```

pub mod addresses;
pub mod auth;
pub mod profile;
pub mod users;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use shopfloor_core::UserRole;
use shopfloor_core::auth::{RoleGate, require_auth, require_role};

use crate::state::AppState;

/// Routes that need no token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
}

/// Routes for any signed-in user.
pub fn account_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(profile::get)
                .put(profile::update)
                .delete(profile::deactivate),
        )
        .route("/profile/password", put(profile::change_password))
        .route(
            "/profile/addresses",
            get(addresses::list).post(addresses::create),
        )
        .route(
            "/profile/addresses/{id}",
            put(addresses::update).delete(addresses::delete),
        )
        .route_layer(middleware::from_fn_with_state(
            state.token_keys().clone(),
            require_auth,
        ))
}

/// Account administration, restricted to admins.
pub fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list))
        // Runs second: role check against the attached claims
        .route_layer(middleware::from_fn_with_state(
            RoleGate::new(UserRole::ADMINS),
            require_role,
        ))
        // Runs first: token verification
        .route_layer(middleware::from_fn_with_state(
            state.token_keys().clone(),
            require_auth,
        ))
}
