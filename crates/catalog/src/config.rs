//! Catalog configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CATALOG_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `JWT_SECRET` - Shared token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `CATALOG_HOST` - Bind address (default: 127.0.0.1)
//! - `CATALOG_PORT` - Listen port (default: 3000)
//! - `JWT_ISSUER` - Expected token issuer (default: shopfloor)
//! - `DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `CORS_ALLOWED_ORIGINS` - Comma-separated origins; CORS is off when empty
//! - `LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;

use shopfloor_core::config::{
    ConfigError, database_url, env_or_default, list_env, load_dotenv, optional_env, parse_env,
    signing_secret,
};
use shopfloor_core::server::{LogFormat, TelemetryConfig};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "shopfloor_catalog=info,shopfloor_core=info,tower_http=debug";

/// Catalog service configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Secret used to verify access tokens issued by the users service
    pub jwt_secret: SecretString,
    /// Issuer every accepted token must carry
    pub jwt_issuer: String,
    /// Maximum pool connections
    pub db_max_connections: u32,
    /// Origins allowed by CORS
    pub cors_allowed_origins: Vec<String>,
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    ///
    /// Loads `.env` first if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the JWT secret fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();

        let host = env_or_default("CATALOG_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("CATALOG_HOST".to_string(), e.to_string()))?;

        Ok(Self {
            database_url: database_url("CATALOG_DATABASE_URL")?,
            host,
            port: parse_env("CATALOG_PORT", 3000)?,
            jwt_secret: signing_secret("JWT_SECRET")?,
            jwt_issuer: env_or_default("JWT_ISSUER", "shopfloor"),
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 10)?,
            cors_allowed_origins: list_env("CORS_ALLOWED_ORIGINS"),
            log_format: parse_env("LOG_FORMAT", LogFormat::Pretty)?,
            sentry_dsn: optional_env("SENTRY_DSN"),
            sentry_environment: optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Logging and Sentry settings for [`shopfloor_core::server::init_telemetry`].
    #[must_use]
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            default_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: self.log_format,
            sentry_dsn: self.sentry_dsn.clone(),
            sentry_environment: self.sentry_environment.clone(),
        }
    }
}
