//! User roles.

use serde::{Deserialize, Serialize};

/// Role carried by every account and copied into its access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "account.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Shopper with access to their own profile only.
    #[default]
    Customer,
    /// Store staff; may manage the catalog.
    Staff,
    /// Full access, including user listings.
    Admin,
}

impl UserRole {
    /// Roles allowed to create, update and delete catalog entries.
    pub const CATALOG_WRITERS: &'static [Self] = &[Self::Staff, Self::Admin];

    /// Roles allowed to administer accounts.
    pub const ADMINS: &'static [Self] = &[Self::Admin];

    /// The role's wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [UserRole::Customer, UserRole::Staff, UserRole::Admin] {
            assert_eq!(role.to_string().parse::<UserRole>().unwrap(), role);
        }
        assert!("superuser".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_role_serde_uses_snake_case() {
        assert_eq!(serde_json::to_string(&UserRole::Staff).unwrap(), "\"staff\"");
        assert!(serde_json::from_str::<UserRole>("\"root\"").is_err());
    }
}
