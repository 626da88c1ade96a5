//! Environment variable helpers shared by the service configurations.
//!
//! Each service builds its own typed config struct out of these helpers so
//! that error reporting and secret validation behave the same everywhere.

use std::collections::HashMap;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Minimum length of a signing secret.
pub const MIN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Load `.env` if present. Missing files are not an error.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Get a required environment variable.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if the variable is unset.
pub fn required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
#[must_use]
pub fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
#[must_use]
pub fn env_or_default(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` if the value does not parse.
pub fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a comma-separated list, dropping empty entries.
#[must_use]
pub fn list_env(key: &str) -> Vec<String> {
    optional_env(key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Get a database URL, falling back to the generic `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` naming `primary_key` if neither is set.
pub fn database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    optional_env(primary_key)
        .or_else(|| optional_env("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Load a signing secret and check its length, placeholder patterns and entropy.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if unset or `ConfigError::InsecureSecret`
/// if it fails validation.
pub fn signing_secret(key: &str) -> Result<SecretString, ConfigError> {
    let secret = SecretString::from(required_env(key)?);
    validate_signing_secret(&secret, key)?;
    Ok(secret)
}

/// Validate that a signing secret is long, not a placeholder and high-entropy.
///
/// # Errors
///
/// Returns `ConfigError::InsecureSecret` describing the failed check.
pub fn validate_signing_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_SECRET_LENGTH} characters (got {})",
                value.len()
            ),
        ));
    }

    let lower = value.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(value);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const STRONG: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy(STRONG) > MIN_ENTROPY_BITS_PER_CHAR);
    }

    #[test]
    fn test_signing_secret_too_short() {
        let err = validate_signing_secret(&SecretString::from("aB3$xY9!"), "JWT_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_signing_secret_placeholder() {
        let secret = SecretString::from(format!("changeme-{STRONG}"));
        let err = validate_signing_secret(&secret, "JWT_SECRET").unwrap_err();
        assert!(err.to_string().contains("placeholder"));
    }

    #[test]
    fn test_signing_secret_low_entropy() {
        let secret = SecretString::from("a".repeat(40));
        let err = validate_signing_secret(&secret, "JWT_SECRET").unwrap_err();
        assert!(err.to_string().contains("entropy"));
    }

    #[test]
    fn test_signing_secret_valid() {
        assert!(validate_signing_secret(&SecretString::from(STRONG), "JWT_SECRET").is_ok());
    }
}
