//! Request validation helpers.
//!
//! Handlers validate a whole payload and report every problem at once, so
//! the helpers here collect messages instead of failing fast.

use serde::{Deserialize, Deserializer};

use crate::slug::slugify;

/// Collects validation problems so a request can report all of them at once.
#[derive(Debug, Default)]
pub struct Validator {
    problems: Vec<String>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` when `ok` is false.
    pub fn check(&mut self, ok: bool, message: impl Into<String>) {
        if !ok {
            self.problems.push(message.into());
        }
    }

    /// Check that a trimmed text field has between 1 and `max` characters.
    pub fn text(&mut self, field: &str, value: &str, max: usize) {
        let len = value.trim().chars().count();
        self.check(len > 0, format!("{field} is required"));
        self.check(len <= max, format!("{field} must be at most {max} characters"));
    }

    /// Check that the slug source (explicit `slug`, else `name`) yields a slug.
    ///
    /// An explicit slug must also fit in `max` characters once normalised.
    /// Slugs derived from a name are truncated instead.
    pub fn slug(&mut self, name: Option<&str>, slug: Option<&str>, max: usize) {
        let (field, source) = match (slug, name) {
            (Some(slug), _) => ("slug", slug),
            (None, Some(name)) if !name.trim().is_empty() => ("name", name),
            _ => return,
        };
        match slugify(source) {
            Ok(normalized) => self.check(
                field == "name" || normalized.len() <= max,
                format!("slug must be at most {max} characters"),
            ),
            Err(_) => self.push(format!("{field} must contain letters or digits")),
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.problems.push(message.into());
    }

    /// `Ok(())` when nothing was recorded, otherwise every message.
    ///
    /// # Errors
    ///
    /// Returns the collected messages.
    pub fn finish(self) -> Result<(), Vec<String>> {
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(self.problems)
        }
    }
}

/// Deserialize a field that distinguishes "absent" from "null".
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// absent gives `None`, `null` gives `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trim an optional text field, treating blank as absent.
#[must_use]
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
