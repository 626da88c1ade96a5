//! Authentication service.
//!
//! Password registration and login, issuing JWT access tokens.

mod error;

pub use error::AuthError;

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Serialize;
use sqlx::PgPool;

use shopfloor_core::auth::{IssuedToken, TokenKeys};
use shopfloor_core::{Email, UserId, UserRole};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserRepository};
use crate::models::{ChangePassword, LoginRequest, RegisterRequest, User};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum password length; Argon2 input is bounded to keep hashing cheap.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash checked when no account matches, so unknown emails cost the same
/// Argon2 work as known ones.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("unmatched-login").ok());

/// Body returned by register and login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: User,
    #[serde(flatten)]
    pub token: IssuedToken,
}

/// Authentication service.
///
/// Handles user registration, login and password changes.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    keys: &'a TokenKeys,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, keys: &'a TokenKeys) -> Self {
        Self {
            users: UserRepository::new(pool),
            keys,
        }
    }

    /// Register a new customer and sign a token for them.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let email = Email::parse(&request.email)?;
        validate_password(&request.password)?;
        let password_hash = hash_password(&request.password)?;

        let user = self
            .users
            .create(&NewUser {
                email: &email,
                password_hash: &password_hash,
                first_name: request.first_name,
                last_name: request.last_name,
                phone: request.phone,
                role: UserRole::Customer,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "user registered");
        self.respond(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown, the
    /// account is inactive or the password is wrong.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AuthError> {
        let Ok(email) = Email::parse(&request.email) else {
            return Err(reject_unknown(&request.password));
        };

        let Some((user, password_hash)) = self.users.get_credentials(&email).await? else {
            return Err(reject_unknown(&request.password));
        };

        verify_password(&request.password, &password_hash)?;
        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self.users.record_login(user.id).await.map_err(|e| match e {
            RepositoryError::NotFound => AuthError::InvalidCredentials,
            other => AuthError::Repository(other),
        })?;
        self.respond(user)
    }

    /// Replace the password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the current password is wrong.
    /// Returns `AuthError::WeakPassword` if the new password doesn't meet requirements.
    pub async fn change_password(
        &self,
        user_id: UserId,
        request: &ChangePassword,
    ) -> Result<(), AuthError> {
        let current_hash = self
            .users
            .get_password_hash(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(&request.current_password, &current_hash)?;
        validate_password(&request.new_password)?;

        let new_hash = hash_password(&request.new_password)?;
        self.users.update_password(user_id, &new_hash).await?;

        tracing::info!(user_id = %user_id, "password changed");
        Ok(())
    }

    fn respond(&self, user: User) -> Result<AuthResponse, AuthError> {
        let token = self.keys.issue(user.id, &user.email, user.role)?;
        Ok(AuthResponse { user, token })
    }
}

/// Check password length bounds.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` describing the failed bound.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Reject a login with no matching account after a throwaway verification.
fn reject_unknown(password: &str) -> AuthError {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
    AuthError::InvalidCredentials
}
