//! Database operations for the catalog `PostgreSQL` schema.
//!
//! # Schema: `catalog`
//!
//! ## Tables
//!
//! - `category` - Category hierarchy (self-referencing `parent_id`)
//! - `product` - Products with price, flags, tags and JSONB metadata
//! - `product_variant` - Purchasable variants keyed by unique SKU
//! - `product_image` - Images, at most one primary per product
//!
//! # Migrations
//!
//! Migrations are stored in `crates/catalog/migrations/` and run via:
//! ```bash
//! cargo run -p shopfloor-cli -- migrate catalog
//! ```

pub mod categories;
pub mod product_query;
pub mod products;

use std::collections::HashSet;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgExecutor, PgPool};
use thiserror::Error;

use shopfloor_core::slug::{disambiguate, truncate_slug};

pub use categories::CategoryRepository;
pub use product_query::ProductFilter;
pub use products::ProductRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate SKU).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict(message)`, anything else to `Database`.
    pub(crate) fn from_unique(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Pick a free slug in `table` for `base`.
///
/// `base` is first cut to the table's slug length. Every slug equal to it or
/// starting with `base-` is loaded and the first unused candidate returned.
/// Inactive rows still hold their slug.
pub(crate) async fn free_slug<'e, E>(
    executor: E,
    table: SlugTable,
    base: &str,
) -> Result<String, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let base = truncate_slug(base, table.max_len());
    let sql = format!(
        "SELECT slug FROM {} WHERE slug = $1 OR slug LIKE $2",
        table.as_str()
    );
    free_value(executor, &sql, &base).await
}

/// First candidate from [`disambiguate`] not returned by `sql`.
///
/// `sql` must select the taken values with `$1` bound to `base` and `$2` to
/// a LIKE pattern matching `base-` prefixes.
pub(crate) async fn free_value<'e, E>(
    executor: E,
    sql: &str,
    base: &str,
) -> Result<String, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let pattern = format!("{}-%", escape_like(base));
    let taken: HashSet<String> = sqlx::query_scalar(sql)
        .bind(base)
        .bind(pattern)
        .fetch_all(executor)
        .await?
        .into_iter()
        .collect();

    Ok(disambiguate(base, &taken))
}

/// Tables that own a slug column.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SlugTable {
    Category,
    Product,
}

impl SlugTable {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Category => "catalog.category",
            Self::Product => "catalog.product",
        }
    }

    const fn max_len(self) -> usize {
        match self {
            Self::Category => crate::models::category::MAX_SLUG_LENGTH,
            Self::Product => crate::models::product::MAX_SLUG_LENGTH,
        }
    }
}

/// Escape `%`, `_` and `\` so `s` matches literally inside a LIKE pattern.
#[must_use]
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_limits_leave_room_for_suffix() {
        // Columns are VARCHAR(120) and VARCHAR(220)
        assert!(SlugTable::Category.max_len() + "-9999".len() <= 120);
        assert!(SlugTable::Product.max_len() + "-9999".len() <= 220);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50% off_now"), "50\\% off\\_now");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }
}
