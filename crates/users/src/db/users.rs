//! User repository.

use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use shopfloor_core::validation::{Validator, clean_optional};
use shopfloor_core::{Email, Pagination, UserId, UserRole};

use super::RepositoryError;
use crate::models::{UpdateProfile, User};

const USER_COLUMNS: &str = "id, email, first_name, last_name, phone, role, is_active, \
     last_login_at, created_at, updated_at";

/// A user row together with its password hash.
#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

/// Fields of a new account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a Email,
    pub password_hash: &'a str,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
}

/// Raw query parameters of `GET /users`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<String>,
    /// Case-insensitive substring of the email address.
    pub search: Option<String>,
    pub active: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// A validated user listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
    pub search: Option<String>,
    pub active: Option<bool>,
    pub pagination: Pagination,
}

impl TryFrom<ListUsersQuery> for UserListQuery {
    type Error = Vec<String>;

    fn try_from(query: ListUsersQuery) -> Result<Self, Self::Error> {
        let mut v = Validator::new();

        let role = non_empty(query.role.as_deref()).and_then(|raw| match raw.parse::<UserRole>() {
            Ok(role) => Some(role),
            Err(e) => {
                v.push(e);
                None
            }
        });
        let active = non_empty(query.active.as_deref()).and_then(|raw| match raw.parse::<bool>() {
            Ok(active) => Some(active),
            Err(_) => {
                v.push("active must be true or false");
                None
            }
        });
        let page = parse_u32(&mut v, "page", query.page.as_deref());
        let limit = parse_u32(&mut v, "limit", query.limit.as_deref());
        let pagination = Pagination::new(page, limit).unwrap_or_else(|e| {
            v.push(e.to_string());
            Pagination::default()
        });

        v.finish()?;
        Ok(Self {
            role,
            search: clean_optional(query.search),
            active,
            pagination,
        })
    }
}

impl UserListQuery {
    fn select_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM account.user"));
        self.push_where(&mut qb);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(i64::from(self.pagination.limit()));
        qb.push(" OFFSET ");
        qb.push_bind(self.pagination.offset());
        qb
    }

    fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM account.user");
        self.push_where(&mut qb);
        qb
    }

    fn push_where(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push(" WHERE TRUE");
        if let Some(role) = self.role {
            qb.push(" AND role = ");
            qb.push_bind(role);
        }
        if let Some(active) = self.active {
            qb.push(" AND is_active = ");
            qb.push_bind(active);
        }
        if let Some(search) = &self.search {
            // strpos needs no LIKE escaping
            qb.push(" AND strpos(email, lower(");
            qb.push_bind(search.clone());
            qb.push(")) > 0");
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_u32(v: &mut Validator, field: &str, raw: Option<&str>) -> Option<u32> {
    let raw = non_empty(raw)?;
    raw.parse()
        .map_err(|_| v.push(format!("{field} must be a positive integer")))
        .ok()
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewUser<'_>) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO account.user (email, password_hash, first_name, last_name, phone, role) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(new.email)
        .bind(new.password_hash)
        .bind(clean_optional(new.first_name.clone()))
        .bind(clean_optional(new.last_name.clone()))
        .bind(clean_optional(new.phone.clone()))
        .bind(new.role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "email already exists"))?;

        Ok(user)
    }

    /// Get an active user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM account.user WHERE id = $1 AND is_active"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Get a user and their password hash by email, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM account.user WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(|r| (r.user, r.password_hash)))
    }

    /// Get the password hash of an active user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM account.user WHERE id = $1 AND is_active",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(hash)
    }

    /// Stamp `last_login_at` and return the refreshed row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user is missing or inactive.
    pub async fn record_login(&self, id: UserId) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE account.user SET last_login_at = now() \
             WHERE id = $1 AND is_active RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user is missing or inactive.
    pub async fn update_profile(
        &self,
        id: UserId,
        input: UpdateProfile,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM account.user WHERE id = $1 AND is_active FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let first_name = input.first_name.map_or(current.first_name, clean_optional);
        let last_name = input.last_name.map_or(current.last_name, clean_optional);
        let phone = input.phone.map_or(current.phone, clean_optional);

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE account.user SET first_name = $2, last_name = $3, phone = $4, \
             updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .bind(phone)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Replace the password hash of an active user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user is missing or inactive.
    pub async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE account.user SET password_hash = $2, updated_at = now() \
             WHERE id = $1 AND is_active",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Deactivate an account and its addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user is missing or already inactive.
    pub async fn deactivate(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE account.user SET is_active = FALSE, updated_at = now() \
             WHERE id = $1 AND is_active",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            "UPDATE account.address SET is_active = FALSE, is_default = FALSE, \
             updated_at = now() WHERE user_id = $1 AND is_active",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(user_id = %id, "account deactivated");
        Ok(())
    }

    /// One page of users matching `query`, plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either query fails.
    pub async fn list(&self, query: &UserListQuery) -> Result<(Vec<User>, i64), RepositoryError> {
        let total: i64 = query
            .count_query()
            .build_query_scalar()
            .fetch_one(self.pool)
            .await?;
        let users = query
            .select_query()
            .build_query_as::<User>()
            .fetch_all(self.pool)
            .await?;
        Ok((users, total))
    }
}
