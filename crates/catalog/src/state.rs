//! Application state shared across handlers.

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use shopfloor_core::auth::TokenKeys;

use crate::config::CatalogConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: CatalogConfig,
    pool: PgPool,
    token_keys: TokenKeys,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The catalog only verifies tokens, so the key's lifetime setting is unused.
    #[must_use]
    pub fn new(config: CatalogConfig, pool: PgPool) -> Self {
        let token_keys = TokenKeys::new(
            &config.jwt_secret,
            config.jwt_issuer.clone(),
            chrono::Duration::zero(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                token_keys,
            }),
        }
    }

    /// Get a reference to the catalog configuration.
    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the token verification keys.
    #[must_use]
    pub fn token_keys(&self) -> &TokenKeys {
        &self.inner.token_keys
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.inner.pool.clone()
    }
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        state.inner.token_keys.clone()
    }
}
