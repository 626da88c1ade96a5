//! Shopfloor Catalog - product and category service.
//!
//! This binary serves the catalog API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework, JSON envelope responses
//! - `PostgreSQL` (`catalog` schema) through sqlx
//! - Access tokens issued by the users service, verified with the shared `JWT_SECRET`
//! - Sentry + tracing for errors and logs, Prometheus for metrics

#![cfg_attr(not(test), forbid(unsafe_code))]

use shopfloor_catalog::{app, config::CatalogConfig, db, state::AppState};
use shopfloor_core::server::{init_telemetry, metrics::init_metrics, serve};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (needed for Sentry init)
    let config = CatalogConfig::from_env()?;

    // Sentry and tracing; the guard flushes pending events on exit
    let _sentry_guard = init_telemetry(&config.telemetry());
    init_metrics();

    // Initialize database connection pool
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Database pool created");

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p shopfloor-cli -- migrate catalog

    let addr = config.socket_addr();
    let state = AppState::new(config, pool);

    serve(app(state), addr).await?;
    Ok(())
}
