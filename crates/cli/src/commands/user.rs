//! User management commands.
//!
//! Mostly used to create the first admin on a fresh database, since the
//! admin panel can only be reached by an existing admin.

use loyalty_card_core::{Role, RoleError};
use loyalty_card_server::services::{AuthError, AuthService};
use thiserror::Error;

use super::{CommandError, connect};

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    InvalidRole(#[from] RoleError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a user with the given role.
///
/// # Returns
///
/// The ID of the created user.
pub async fn create(username: &str, password: &str, role: &str) -> Result<i32, UserError> {
    let role: Role = role.parse()?;
    let pool = connect().await?;

    tracing::info!("Creating user: {} ({})", username, role);
    let user = AuthService::new(&pool)
        .create_user(username, password, role)
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Username: {}, Role: {}",
        user.id,
        user.username,
        user.role
    );

    Ok(user.id.as_i32())
}
