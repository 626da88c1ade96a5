//! Database migration commands.
//!
//! # Environment Variables
//!
//! - `CATALOG_DATABASE_URL` - `PostgreSQL` connection string for the catalog
//! - `USERS_DATABASE_URL` - `PostgreSQL` connection string for accounts
//!
//! Both fall back to `DATABASE_URL`, so a single database can hold both schemas.
//!
//! # Migration Files
//!
//! Catalog migrations: `crates/catalog/migrations/`
//! Users migrations: `crates/users/migrations/`

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use shopfloor_core::config::{ConfigError, database_url, load_dotenv};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run catalog database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing, the connection fails or a
/// migration fails.
pub async fn catalog() -> Result<(), MigrationError> {
    let pool = connect("CATALOG_DATABASE_URL", "catalog").await?;

    tracing::info!("Running catalog migrations...");
    sqlx::migrate!("../catalog/migrations").run(&pool).await?;

    tracing::info!("Catalog migrations complete!");
    Ok(())
}

/// Run users database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing, the connection fails or a
/// migration fails.
pub async fn users() -> Result<(), MigrationError> {
    let pool = connect("USERS_DATABASE_URL", "users").await?;

    tracing::info!("Running users migrations...");
    sqlx::migrate!("../users/migrations").run(&pool).await?;

    tracing::info!("Users migrations complete!");
    Ok(())
}

async fn connect(env_key: &str, label: &str) -> Result<PgPool, MigrationError> {
    load_dotenv();
    let url = database_url(env_key)?;

    tracing::info!("Connecting to {label} database...");
    Ok(PgPool::connect(url.expose_secret()).await?)
}
