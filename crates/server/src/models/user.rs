//! Staff and admin account types.

use chrono::{DateTime, Utc};

use loyalty_card_core::{Role, UserId, Username};

/// A user account (domain type).
///
/// The password hash never leaves the repository layer except through
/// [`crate::db::users::UserRepository::get_credentials`].
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name.
    pub username: Username,
    /// Permission level.
    pub role: Role,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}
