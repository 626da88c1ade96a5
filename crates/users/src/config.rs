//! Users service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `USERS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `USERS_HOST` - Bind address (default: 127.0.0.1)
//! - `USERS_PORT` - Listen port (default: 3001)
//! - `JWT_ISSUER` - Token issuer (default: shopfloor)
//! - `JWT_EXPIRATION_HOURS` - Token lifetime (default: 24)
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
const DEFAULT_LOG_FILTER: &str = "shopfloor_users=info,shopfloor_core=info,tower_http=debug";

/// Longest accepted token lifetime (30 days).
const MAX_JWT_EXPIRATION_HOURS: i64 = 24 * 30;

/// Users service configuration.
#[derive(Debug, Clone)]
pub struct UsersConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Secret used to sign access tokens
    pub jwt_secret: SecretString,
    pub jwt_issuer: String,
    /// Access token lifetime in hours
    pub jwt_expiration_hours: i64,
    /// Maximum pool connections
    pub db_max_connections: u32,
    /// Origins allowed by CORS
    pub cors_allowed_origins: Vec<String>,
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl UsersConfig {
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

        let host = env_or_default("USERS_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("USERS_HOST".to_string(), e.to_string()))?;

        let jwt_expiration_hours = parse_env("JWT_EXPIRATION_HOURS", 24_i64)?;
        if !(1..=MAX_JWT_EXPIRATION_HOURS).contains(&jwt_expiration_hours) {
            return Err(ConfigError::InvalidEnvVar(
                "JWT_EXPIRATION_HOURS".to_string(),
                format!("must be between 1 and {MAX_JWT_EXPIRATION_HOURS}"),
            ));
        }

        Ok(Self {
            database_url: database_url("USERS_DATABASE_URL")?,
            host,
            port: parse_env("USERS_PORT", 3001)?,
            jwt_secret: signing_secret("JWT_SECRET")?,
            jwt_issuer: env_or_default("JWT_ISSUER", "shopfloor"),
            jwt_expiration_hours,
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

    /// Access token lifetime.
    #[must_use]
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.jwt_expiration_hours)
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
