//! HTTP route handlers for the catalog.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Liveness check
//! GET    /health/ready                        - Readiness check (database)
//! GET    /metrics                             - Prometheus metrics
//!
//! # Products (public reads)
//! GET    /products                            - Filtered, paginated listing
//! GET    /products/{id}                       - Product with variants and images
//! GET    /products/slug/{slug}                - Same, by slug
//!
//! # Products (staff/admin)
//! POST   /products                            - Create with variants and images
//! PUT    /products/{id}                       - Partial update
//! DELETE /products/{id}                       - Soft delete
//! POST   /products/{id}/variants              - Add variant
//! PUT    /products/{id}/variants/{variant_id} - Update variant
//! DELETE /products/{id}/variants/{variant_id} - Soft delete variant
//! POST   /products/{id}/images                - Add image
//! DELETE /products/{id}/images/{image_id}     - Remove image
//!
//! # Categories
//! GET    /categories                          - Active categories (?parent_id=)
//! GET    /categories/tree                     - Nested hierarchy
//! GET    /categories/{id}                     - Category with children
//! POST   /categories                          - Create (staff/admin)
//! PUT    /categories/{id}                     - Update (staff/admin)
//! DELETE /categories/{id}                     - Soft delete (staff/admin)
//! ```

pub mod categories;
pub mod products;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use shopfloor_core::UserRole;
use shopfloor_core::auth::{RoleGate, require_auth, require_role};

use crate::state::AppState;

/// Public read-only routes.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::list))
        .route("/products/{id}", get(products::get))
        .route("/products/slug/{slug}", get(products::get_by_slug))
        .route("/categories", get(categories::list))
        .route("/categories/tree", get(categories::tree))
        .route("/categories/{id}", get(categories::get))
}

/// Write routes, restricted to staff and admins.
pub fn staff_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/products", post(products::create))
        .route(
            "/products/{id}",
            put(products::update).delete(products::delete),
        )
        .route("/products/{id}/variants", post(products::create_variant))
        .route(
            "/products/{id}/variants/{variant_id}",
            put(products::update_variant).delete(products::delete_variant),
        )
        .route("/products/{id}/images", post(products::create_image))
        .route(
            "/products/{id}/images/{image_id}",
            delete(products::delete_image),
        )
        .route("/categories", post(categories::create))
        .route(
            "/categories/{id}",
            put(categories::update).delete(categories::delete),
        )
        // Runs second: role check against the attached claims
        .route_layer(middleware::from_fn_with_state(
            RoleGate::new(UserRole::CATALOG_WRITERS),
            require_role,
        ))
        // Runs first: token verification
        .route_layer(middleware::from_fn_with_state(
            state.token_keys().clone(),
            require_auth,
        ))
}
