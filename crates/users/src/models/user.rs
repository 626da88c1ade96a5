//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfloor_core::validation::{Validator, double_option};
use shopfloor_core::{Email, UserId, UserRole};

/// Maximum length of a first or last name.
pub const MAX_NAME_LENGTH: usize = 100;
/// Maximum length of a phone number.
pub const MAX_PHONE_LENGTH: usize = 32;

/// An account (domain type). The password hash never leaves the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl RegisterRequest {
    /// Check the profile fields. Email and password are checked by the auth service.
    ///
    /// # Errors
    ///
    /// Returns one message per problem.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut v = Validator::new();
        check_profile(
            &mut v,
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.phone.as_deref(),
        );
        v.finish()
    }
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `PUT /profile`. Absent fields are left unchanged, `null` clears.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfile {
    #[serde(default, deserialize_with = "double_option")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
}

impl UpdateProfile {
    /// Check field constraints.
    ///
    /// # Errors
    ///
    /// Returns one message per problem.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut v = Validator::new();
        check_profile(
            &mut v,
            self.first_name.as_ref().and_then(Option::as_deref),
            self.last_name.as_ref().and_then(Option::as_deref),
            self.phone.as_ref().and_then(Option::as_deref),
        );
        v.finish()
    }
}

/// Body of `PUT /profile/password`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

fn check_profile(
    v: &mut Validator,
    first_name: Option<&str>,
    last_name: Option<&str>,
    phone: Option<&str>,
) {
    for (field, value) in [("first_name", first_name), ("last_name", last_name)] {
        if let Some(value) = value {
            v.check(
                value.trim().chars().count() <= MAX_NAME_LENGTH,
                format!("{field} must be at most {MAX_NAME_LENGTH} characters"),
            );
        }
    }
    if let Some(phone) = phone.map(str::trim).filter(|p| !p.is_empty()) {
        v.check(is_valid_phone(phone), "phone must contain 7 to 15 digits");
    }
}

/// A phone number: digits with optional `+`, spaces, dots, dashes and parentheses.
fn is_valid_phone(phone: &str) -> bool {
    if phone.len() > MAX_PHONE_LENGTH {
        return false;
    }
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '.' | '(' | ')'));
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    allowed && (7..=15).contains(&digits)
}
