//! Integration test harness for Shopfloor.
//!
//! Each test boots a service router on an ephemeral port and talks to it
//! over HTTP with `reqwest`, exactly as a client would.
//!
//! # Running Tests
//!
//! ```bash
//! # Everything that does not need a database
//! cargo test -p shopfloor-integration-tests
//!
//! # Full contract tests against PostgreSQL (migrations are applied automatically)
//! TEST_CATALOG_DATABASE_URL=postgres://localhost/shopfloor_test \
//! TEST_USERS_DATABASE_URL=postgres://localhost/shopfloor_test \
//!     cargo test -p shopfloor-integration-tests -- --ignored
//! ```
//!
//! Without a database URL the services get a lazy pool pointed at a closed
//! port, so anything that reaches the database fails fast.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use reqwest::Client;
use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use shopfloor_catalog::config::CatalogConfig;
use shopfloor_core::auth::TokenKeys;
use shopfloor_core::server::LogFormat;
use shopfloor_core::{Email, UserId, UserRole};
use shopfloor_users::config::UsersConfig;

/// Signing secret shared by both services under test.
pub const TEST_JWT_SECRET: &str = "k3y-Material-For-Integration-Tests-0123456789!";
/// Issuer configured for both services under test.
pub const TEST_JWT_ISSUER: &str = "shopfloor";

const UNREACHABLE_DATABASE_URL: &str = "postgres://shopfloor@127.0.0.1:1/unreachable";

/// Errors from setting up a test service.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("email: {0}")]
    Email(#[from] shopfloor_core::EmailError),
    #[error("token: {0}")]
    Token(#[from] shopfloor_core::auth::TokenError),
}

/// A service listening on a local ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
}

impl TestServer {
    /// Serve `app` on `127.0.0.1:0` in a background task.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Io` if the listener cannot be bound.
    pub async fn spawn(app: Router) -> Result<Self, HarnessError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self {
            addr,
            client: Client::new(),
        })
    }

    /// Absolute URL for `path` on this server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

/// Database URL from `key`, if the environment provides one.
#[must_use]
pub fn database_url(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// A pool that never connects until used, pointed at a closed port.
///
/// # Errors
///
/// Returns `HarnessError::Database` if the URL does not parse.
pub fn unreachable_pool() -> Result<PgPool, HarnessError> {
    Ok(PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(500))
        .connect_lazy(UNREACHABLE_DATABASE_URL)?)
}

/// Catalog configuration for tests; only the JWT settings matter.
#[must_use]
pub fn catalog_config() -> CatalogConfig {
    CatalogConfig {
        database_url: SecretString::from(UNREACHABLE_DATABASE_URL),
        host: [127, 0, 0, 1].into(),
        port: 0,
        jwt_secret: SecretString::from(TEST_JWT_SECRET),
        jwt_issuer: TEST_JWT_ISSUER.to_owned(),
        db_max_connections: 5,
        cors_allowed_origins: vec!["http://localhost:5173".to_owned()],
        log_format: LogFormat::Pretty,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Users configuration for tests; only the JWT settings matter.
#[must_use]
pub fn users_config() -> UsersConfig {
    UsersConfig {
        database_url: SecretString::from(UNREACHABLE_DATABASE_URL),
        host: [127, 0, 0, 1].into(),
        port: 0,
        jwt_secret: SecretString::from(TEST_JWT_SECRET),
        jwt_issuer: TEST_JWT_ISSUER.to_owned(),
        jwt_expiration_hours: 1,
        db_max_connections: 5,
        cors_allowed_origins: Vec::new(),
        log_format: LogFormat::Pretty,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Start the catalog service.
///
/// With a database URL the pool connects eagerly and the catalog
/// migrations are applied first.
///
/// # Errors
///
/// Returns a `HarnessError` if connecting, migrating or binding fails.
pub async fn spawn_catalog(database_url: Option<&str>) -> Result<TestServer, HarnessError> {
    let pool = match database_url {
        Some(url) => {
            let pool = PgPool::connect(url).await?;
            sqlx::migrate!("../catalog/migrations").run(&pool).await?;
            pool
        }
        None => unreachable_pool()?,
    };
    let state = shopfloor_catalog::state::AppState::new(catalog_config(), pool);
    TestServer::spawn(shopfloor_catalog::app(state)).await
}

/// Start the users service.
///
/// With a database URL the pool connects eagerly and the users
/// migrations are applied first.
///
/// # Errors
///
/// Returns a `HarnessError` if connecting, migrating or binding fails.
pub async fn spawn_users(database_url: Option<&str>) -> Result<TestServer, HarnessError> {
    let pool = match database_url {
        Some(url) => {
            let pool = PgPool::connect(url).await?;
            sqlx::migrate!("../users/migrations").run(&pool).await?;
            pool
        }
        None => unreachable_pool()?,
    };
    let state = shopfloor_users::state::AppState::new(users_config(), pool);
    TestServer::spawn(shopfloor_users::app(state)).await
}

/// Keys matching the test services' JWT settings.
#[must_use]
pub fn token_keys() -> TokenKeys {
    TokenKeys::new(
        &SecretString::from(TEST_JWT_SECRET),
        TEST_JWT_ISSUER,
        chrono::Duration::hours(1),
    )
}

/// A signed `Authorization` header value for an arbitrary user.
///
/// # Errors
///
/// Returns an error if the token cannot be signed.
pub fn bearer(user_id: i32, role: UserRole) -> Result<String, HarnessError> {
    let email = Email::parse("tester@example.com")?;
    let issued = token_keys().issue(UserId::new(user_id), &email, role)?;
    Ok(format!("Bearer {}", issued.token))
}

/// An email address no other test run has used.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", uuid::Uuid::new_v4().simple())
}
