//! Staff roles.

use serde::{Deserialize, Serialize};

/// Error returned when a role string is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0} (expected admin or staff)")]
pub struct RoleError(pub String);

/// Role of an authenticated user.
///
/// Admins manage users, customers and the drink catalog; staff can only
/// look up customers and submit orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "loyalty.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access including user, customer and catalog management.
    Admin,
    /// Order entry and customer lookup.
    Staff,
}

impl Role {
    /// Returns the role as its canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
        }
    }

    /// Whether this role may use the admin panel.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleError;

    /// Parses a role name, case-insensitively.
    ///
    /// `barista` is accepted as a legacy name for [`Role::Staff`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "staff" | "barista" => Ok(Self::Staff),
            _ => Err(RoleError(s.to_owned())),
        }
    }
}
