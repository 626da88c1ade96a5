//! JWT access tokens.
//!
//! The users service issues HS256 tokens on register/login; both services
//! verify them with the same shared secret. Claims carry the user's id, email
//! and role so role checks never need a database round trip.

pub mod middleware;

use std::sync::Arc;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::types::{Email, UserId, UserRole};

pub use middleware::{AuthRejection, CurrentUser, RoleGate, require_auth, require_role};

/// Errors from issuing or verifying tokens.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token's `exp` is in the past.
    #[error("token expired")]
    Expired,
    /// Signature, issuer, structure or claims are invalid.
    #[error("invalid token: {0}")]
    Invalid(String),
    /// Signing failed.
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid(err.to_string()),
        }
    }
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expires at (unix seconds).
    pub exp: i64,
    /// Issuer.
    pub iss: String,
}

impl Claims {
    /// The user ID in `sub`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` if `sub` is not a numeric ID.
    pub fn user_id(&self) -> Result<UserId, TokenError> {
        self.sub
            .parse::<i32>()
            .map(UserId::new)
            .map_err(|_| TokenError::Invalid("subject is not a user id".to_owned()))
    }

    /// Whether the token's role is one of `allowed`.
    #[must_use]
    pub fn has_role(&self, allowed: &[UserRole]) -> bool {
        allowed.contains(&self.role)
    }
}

/// A freshly signed token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: &'static str,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

/// Signing and verification keys for access tokens.
///
/// Cheaply cloneable; the keys live behind an `Arc`.
#[derive(Clone)]
pub struct TokenKeys {
    inner: Arc<TokenKeysInner>,
}

struct TokenKeysInner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("keys", &"[REDACTED]")
            .field("issuer", &self.inner.issuer)
            .field("ttl", &self.inner.ttl)
            .finish()
    }
}

impl TokenKeys {
    /// Build keys from the shared secret.
    #[must_use]
    pub fn new(secret: &SecretString, issuer: impl Into<String>, ttl: Duration) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            inner: Arc::new(TokenKeysInner {
                encoding: EncodingKey::from_secret(bytes),
                decoding: DecodingKey::from_secret(bytes),
                issuer: issuer.into(),
                ttl,
            }),
        }
    }

    /// Token lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Sign a token for a user, valid from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(
        &self,
        user_id: UserId,
        email: &Email,
        role: UserRole,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(user_id, email, role, Utc::now())
    }

    /// Sign a token as if issued at `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue_at(
        &self,
        user_id: UserId,
        email: &Email,
        role: UserRole,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.inner.ttl).timestamp(),
            iss: self.inner.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.inner.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            token,
            token_type: "Bearer",
            expires_in: self.inner.ttl.num_seconds(),
        })
    }

    /// Verify signature, expiry and issuer, returning the claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` or `TokenError::Invalid`.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.inner.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        let data = decode::<Claims>(token, &self.inner.decoding, &validation)?;
        Ok(data.claims)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively; an empty token is treated as absent.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
