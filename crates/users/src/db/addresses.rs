//! Address repository.
//!
//! Every query is scoped to the owning user, so an address belonging to
//! someone else behaves exactly like a missing one.

use sqlx::{PgConnection, PgPool};

use shopfloor_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::{Address, CreateAddress, UpdateAddress};

const ADDRESS_COLUMNS: &str = "id, user_id, label, line1, line2, city, region, postal_code, \
     country, is_default, is_active, created_at, updated_at";

/// Repository for address database operations.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active addresses of a user, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM account.address \
             WHERE user_id = $1 AND is_active ORDER BY is_default DESC, created_at, id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(addresses)
    }

    /// Add an address.
    ///
    /// The user's first active address always becomes the default; an
    /// address created with `is_default` takes the flag from the previous one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user is missing or inactive.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        input: CreateAddress,
    ) -> Result<Address, RepositoryError> {
        let input = input.normalized();
        let mut tx = self.pool.begin().await?;

        lock_user(&mut *tx, user_id).await?;

        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM account.address WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let is_default = input.is_default || existing == 0;
        if is_default {
            clear_default(&mut *tx, user_id, None).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            "INSERT INTO account.address \
             (user_id, label, line1, line2, city, region, postal_code, country, is_default) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&input.label)
        .bind(&input.line1)
        .bind(&input.line2)
        .bind(&input.city)
        .bind(&input.region)
        .bind(&input.postal_code)
        .bind(&input.country)
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "default address already set"))?;

        tx.commit().await?;
        Ok(address)
    }

    /// Apply a partial update to one of the user's active addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is missing,
    /// inactive or owned by someone else.
    pub async fn update(
        &self,
        user_id: UserId,
        id: AddressId,
        input: UpdateAddress,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_user(&mut *tx, user_id).await?;

        let current = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM account.address \
             WHERE id = $1 AND user_id = $2 AND is_active FOR UPDATE"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let merged = input.apply(current);
        if merged.is_default {
            clear_default(&mut *tx, user_id, Some(id)).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            "UPDATE account.address SET label = $2, line1 = $3, line2 = $4, city = $5, \
             region = $6, postal_code = $7, country = $8, is_default = $9, updated_at = now() \
             WHERE id = $1 RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(id)
        .bind(&merged.label)
        .bind(&merged.line1)
        .bind(&merged.line2)
        .bind(&merged.city)
        .bind(&merged.region)
        .bind(&merged.postal_code)
        .bind(&merged.country)
        .bind(merged.is_default)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "default address already set"))?;

        tx.commit().await?;
        Ok(address)
    }

    /// Soft delete one of the user's addresses.
    ///
    /// Deleting the default address does not promote another one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is missing,
    /// inactive or owned by someone else.
    pub async fn soft_delete(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE account.address SET is_active = FALSE, is_default = FALSE, \
             updated_at = now() WHERE id = $1 AND user_id = $2 AND is_active",
        )
        .bind(id)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Lock an active user row for the rest of the transaction.
///
/// Default-flag changes for one user run one at a time behind this lock.
async fn lock_user(conn: &mut PgConnection, user_id: UserId) -> Result<(), RepositoryError> {
    sqlx::query_scalar::<_, UserId>(
        "SELECT id FROM account.user WHERE id = $1 AND is_active FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;
    Ok(())
}

/// Clear the default flag on the user's active addresses, except `keep`.
async fn clear_default(
    conn: &mut PgConnection,
    user_id: UserId,
    keep: Option<AddressId>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE account.address SET is_default = FALSE, updated_at = now() \
         WHERE user_id = $1 AND is_active AND is_default \
         AND ($2::INTEGER IS NULL OR id <> $2)",
    )
    .bind(user_id)
    .bind(keep)
    .execute(conn)
    .await?;
    Ok(())
}
