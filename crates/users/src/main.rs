//! Shopfloor Users - accounts, authentication and addresses.
//!
//! This binary serves the users API on port 3001.

#![cfg_attr(not(test), forbid(unsafe_code))]

use shopfloor_core::server::{init_telemetry, metrics::init_metrics, serve};
use shopfloor_users::{app, config::UsersConfig, db, state::AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = UsersConfig::from_env()?;

    // Sentry and tracing; the guard flushes pending events on exit
    let _sentry_guard = init_telemetry(&config.telemetry());
    init_metrics();

    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Database pool created");

    // Migrations run separately: cargo run -p shopfloor-cli -- migrate users
    let addr = config.socket_addr();
    let state = AppState::new(config, pool);

    serve(app(state), addr).await?;
    Ok(())
}
