//! Postal address domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfloor_core::validation::{Validator, clean_optional, double_option};
use shopfloor_core::{AddressId, UserId};

/// A postal address owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    /// Free-form name such as "Home" or "Office".
    pub label: Option<String>,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    /// State, province or county.
    pub region: Option<String>,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 code, uppercase.
    pub country: String,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /profile/addresses`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAddress {
    pub label: Option<String>,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
    /// Setting this clears the flag on the user's other addresses.
    #[serde(default)]
    pub is_default: bool,
}

impl CreateAddress {
    /// Check field constraints.
    ///
    /// # Errors
    ///
    /// Returns one message per problem.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut v = Validator::new();
        v.text("line1", &self.line1, 200);
        v.text("city", &self.city, 100);
        v.text("postal_code", &self.postal_code, 20);
        check_country(&mut v, &self.country);
        check_optional(&mut v, "label", self.label.as_deref(), 50);
        check_optional(&mut v, "line2", self.line2.as_deref(), 200);
        check_optional(&mut v, "region", self.region.as_deref(), 100);
        v.finish()
    }

    /// Trimmed copy with blank optional fields dropped and the country uppercased.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            label: clean_optional(self.label),
            line1: self.line1.trim().to_owned(),
            line2: clean_optional(self.line2),
            city: self.city.trim().to_owned(),
            region: clean_optional(self.region),
            postal_code: self.postal_code.trim().to_owned(),
            country: self.country.trim().to_ascii_uppercase(),
            is_default: self.is_default,
        }
    }
}

/// Body of `PUT /profile/addresses/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAddress {
    #[serde(default, deserialize_with = "double_option")]
    pub label: Option<Option<String>>,
    pub line1: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub line2: Option<Option<String>>,
    pub city: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub region: Option<Option<String>>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub is_default: Option<bool>,
}

impl UpdateAddress {
    /// Check field constraints.
    ///
    /// # Errors
    ///
    /// Returns one message per problem.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut v = Validator::new();
        if let Some(line1) = &self.line1 {
            v.text("line1", line1, 200);
        }
        if let Some(city) = &self.city {
            v.text("city", city, 100);
        }
        if let Some(postal_code) = &self.postal_code {
            v.text("postal_code", postal_code, 20);
        }
        if let Some(country) = &self.country {
            check_country(&mut v, country);
        }
        check_optional(&mut v, "label", self.label.as_ref().and_then(Option::as_deref), 50);
        check_optional(&mut v, "line2", self.line2.as_ref().and_then(Option::as_deref), 200);
        check_optional(&mut v, "region", self.region.as_ref().and_then(Option::as_deref), 100);
        v.finish()
    }

    /// Merge onto `current`, producing the row to store.
    #[must_use]
    pub fn apply(self, current: Address) -> Address {
        Address {
            label: self.label.map_or(current.label, clean_optional),
            line1: self.line1.map_or(current.line1, |s| s.trim().to_owned()),
            line2: self.line2.map_or(current.line2, clean_optional),
            city: self.city.map_or(current.city, |s| s.trim().to_owned()),
            region: self.region.map_or(current.region, clean_optional),
            postal_code: self
                .postal_code
                .map_or(current.postal_code, |s| s.trim().to_owned()),
            country: self
                .country
                .map_or(current.country, |s| s.trim().to_ascii_uppercase()),
            is_default: self.is_default.unwrap_or(current.is_default),
            ..current
        }
    }
}

fn check_country(v: &mut Validator, country: &str) {
    let country = country.trim();
    v.check(
        country.len() == 2 && country.chars().all(|c| c.is_ascii_alphabetic()),
        "country must be a two-letter ISO 3166-1 code",
    );
}

fn check_optional(v: &mut Validator, field: &str, value: Option<&str>, max: usize) {
    if let Some(value) = value {
        v.check(
            value.trim().chars().count() <= max,
            format!("{field} must be at most {max} characters"),
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn address() -> Address {
        Address {
            id: AddressId::new(1),
            user_id: UserId::new(1),
            label: Some("Home".to_owned()),
            line1: "1 Main St".to_owned(),
            line2: Some("Apt 2".to_owned()),
            city: "Springfield".to_owned(),
            region: None,
            postal_code: "12345".to_owned(),
            country: "US".to_owned(),
            is_default: true,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_address_validation() {
        let ok: CreateAddress = serde_json::from_value(json!({
            "line1": "1 Main St", "city": "Springfield", "postal_code": "12345", "country": "us"
        }))
        .unwrap();
        assert!(ok.validate().is_ok());
        assert_eq!(ok.normalized().country, "US");

        let bad: CreateAddress = serde_json::from_value(json!({
            "line1": " ", "city": "Springfield", "postal_code": "12345", "country": "USA"
        }))
        .unwrap();
        assert_eq!(
            bad.validate().unwrap_err(),
            vec!["line1 is required", "country must be a two-letter ISO 3166-1 code"]
        );
    }

    #[test]
    fn test_update_address_apply() {
        let update: UpdateAddress =
            serde_json::from_value(json!({"line2": null, "city": " Shelbyville ", "country": "ca"}))
                .unwrap();
        let merged = update.apply(address());
        assert_eq!(merged.line2, None);
        assert_eq!(merged.city, "Shelbyville");
        assert_eq!(merged.country, "CA");
        assert_eq!(merged.label.as_deref(), Some("Home"));
        assert!(merged.is_default);
    }
}
