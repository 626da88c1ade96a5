//! Admin account bootstrap.
//!
//! # Usage
//!
//! ```bash
//! sf-cli admin create -e admin@example.com -p 'a long password'
//! sf-cli admin create -e clerk@example.com -p 'a long password' -r staff
//! ```
//!
//! # Environment Variables
//!
//! - `USERS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use shopfloor_core::config::{ConfigError, database_url, load_dotenv};
use shopfloor_core::{Email, EmailError, UserId, UserRole};
use shopfloor_users::db::RepositoryError;
use shopfloor_users::db::users::{NewUser, UserRepository};
use shopfloor_users::services::AuthError;
use shopfloor_users::services::auth::{hash_password, validate_password};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Only privileged roles can be created here.
    #[error("Invalid role: {0}. Valid roles: admin, staff")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password rejected or hashing failed.
    #[error("Password error: {0}")]
    Password(#[from] AuthError),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

/// Arguments of `admin create`.
#[derive(Debug)]
pub struct NewAdmin {
    pub email: String,
    pub password: String,
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Parse a role, allowing only privileged ones.
fn privileged_role(role: &str) -> Result<UserRole, AdminError> {
    match role.parse::<UserRole>() {
        Ok(role @ (UserRole::Admin | UserRole::Staff)) => Ok(role),
        _ => Err(AdminError::InvalidRole(role.to_owned())),
    }
}

/// Create a new privileged account.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns `AdminError` if validation fails, the email is taken or the
/// database is unreachable.
pub async fn create_user(input: NewAdmin) -> Result<UserId, AdminError> {
    let role = privileged_role(&input.role)?;
    let email = Email::parse(&input.email)?;
    validate_password(&input.password)?;
    let password_hash = hash_password(&input.password)?;

    load_dotenv();
    let url = database_url("USERS_DATABASE_URL")?;

    tracing::info!("Connecting to users database...");
    let pool = PgPool::connect(url.expose_secret()).await?;

    tracing::info!("Creating {role} account: {email}");
    let user = UserRepository::new(&pool)
        .create(&NewUser {
            email: &email,
            password_hash: &password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
            phone: None,
            role,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        "Account created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );

    Ok(user.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privileged_role() {
        assert!(matches!(privileged_role("admin"), Ok(UserRole::Admin)));
        assert!(matches!(privileged_role("staff"), Ok(UserRole::Staff)));
        assert!(matches!(
            privileged_role("customer"),
            Err(AdminError::InvalidRole(_))
        ));
        assert!(privileged_role("root").is_err());
    }
}
