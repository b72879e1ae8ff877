//! Authentication service.
//!
//! Password login plus the user management operations behind the admin
//! panel and the CLI.

mod error;

pub use error::AuthError;

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use loyalty_card_core::{Role, UserId, Username};

use crate::db::RepositoryError;
use crate::db::users::{AdminGuarded, UserRepository};
use crate::models::user::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash verified when the username is unknown, so both failure paths cost
/// one Argon2 verification.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("loyalty-card-dummy-password").ok());

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Login with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the user is unknown or the
    /// password is wrong. The two cases are not distinguished.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let Ok(username) = Username::parse(username) else {
            return Err(reject_unknown_user(password));
        };

        let Some((user, password_hash)) = self.users.get_credentials(&username).await? else {
            return Err(reject_unknown_user(password));
        };

        verify_password(password, &password_hash)?;

        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
        Ok(user)
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername` if the username format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the username is taken.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        let username = Username::parse(username)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(&username, &password_hash, role)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, username = %user.username, role = %user.role, "User created");
        Ok(user)
    }

    /// Change a user's password and/or role on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the target doesn't exist.
    /// Returns `AuthError::WeakPassword` if the new password is too short.
    /// Returns `AuthError::CannotChangeOwnRole` if `actor` changes their own role.
    /// Returns `AuthError::LastAdmin` if the change would demote the last admin.
    pub async fn update_user(
        &self,
        actor: UserId,
        id: UserId,
        password: Option<&str>,
        role: Option<Role>,
    ) -> Result<User, AuthError> {
        let target = self
            .users
            .get_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let password_hash = match password {
            Some(p) => {
                validate_password(p)?;
                Some(hash_password(p)?)
            }
            None => None,
        };

        if let Some(new_role) = role
            && new_role != target.role
        {
            if actor == id {
                return Err(AuthError::CannotChangeOwnRole);
            }
            guarded(self.users.update_role_keeping_admin(id, new_role).await?)?;
        }

        if let Some(hash) = password_hash {
            self.users
                .update_password(id, &hash)
                .await
                .map_err(not_found_as_user)?;
        }

        tracing::info!(
            actor = %actor,
            user_id = %id,
            password_changed = password.is_some(),
            role = ?role,
            "User updated"
        );

        self.users
            .get_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Delete a user on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CannotDeleteSelf` if `actor` targets their own account.
    /// Returns `AuthError::UserNotFound` if the target doesn't exist.
    /// Returns `AuthError::LastAdmin` if the target is the only admin.
    pub async fn delete_user(&self, actor: UserId, id: UserId) -> Result<(), AuthError> {
        if actor == id {
            return Err(AuthError::CannotDeleteSelf);
        }

        let target = self
            .users
            .get_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        guarded(self.users.delete_keeping_admin(id).await?)?;

        tracing::info!(actor = %actor, user_id = %id, username = %target.username, "User deleted");
        Ok(())
    }
}

fn guarded(outcome: AdminGuarded) -> Result<(), AuthError> {
    match outcome {
        AdminGuarded::Applied => Ok(()),
        AdminGuarded::NotFound => Err(AuthError::UserNotFound),
        AdminGuarded::LastAdmin => Err(AuthError::LastAdmin),
    }
}

fn not_found_as_user(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::NotFound => AuthError::UserNotFound,
        other => AuthError::Repository(other),
    }
}

// =============================================================================
// Password Helpers
// =============================================================================

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Spend one verification on the dummy hash and fail.
fn reject_unknown_user(password: &str) -> AuthError {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
    AuthError::InvalidCredentials
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
