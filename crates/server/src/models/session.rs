//! Session-stored identity.

use serde::{Deserialize, Serialize};

use loyalty_card_core::{Role, UserId, Username};

use super::user::User;

/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Login name, shown in the page header.
    pub username: Username,
    /// Role as of the last request that loaded the account.
    pub role: Role,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

impl CurrentUser {
    /// Whether the user may use the admin panel.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Landing page for this user after login.
    #[must_use]
    pub const fn home_path(&self) -> &'static str {
        if self.is_admin() { "/admin" } else { "/order" }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
