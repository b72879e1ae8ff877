//! User account repository.
//!
//! Password hashes are only returned by [`UserRepository::get_credentials`];
//! every other query yields the hash-free [`User`] domain type.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use loyalty_card_core::{Role, UserId, Username};

use super::RepositoryError;
use crate::models::user::User;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    username: String,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let username = Username::parse(&row.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            username,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Result of a change that must leave at least one admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminGuarded {
    /// The change was written.
    Applied,
    /// No user with that ID.
    NotFound,
    /// The change would have removed the last admin; nothing was written.
    LastAdmin,
}

/// Whether removing `id` from `admins` still leaves one.
fn leaves_an_admin(admins: &[i32], id: UserId) -> bool {
    !admins.contains(&id.as_i32()) || admins.len() > 1
}

/// Lock every admin row until the transaction ends and return their IDs.
///
/// Rows are locked in ID order so concurrent callers cannot deadlock.
async fn lock_admins(conn: &mut PgConnection) -> Result<Vec<i32>, RepositoryError> {
    let ids = sqlx::query_scalar::<_, i32>(
        r"
        SELECT id
        FROM loyalty.user_account
        WHERE role = $1
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(Role::Admin)
    .fetch_all(conn)
    .await?;

    Ok(ids)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user account database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all users ordered by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored username is invalid.
    pub async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, username, role, created_at, updated_at
            FROM loyalty.user_account
            ORDER BY username
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, username, role, created_at, updated_at
            FROM loyalty.user_account
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user and their password hash for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_credentials(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT id, username, role, created_at, updated_at, password_hash
            FROM loyalty.user_account
            WHERE username = $1
            ",
        )
        .bind(username.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((r.user.try_into()?, r.password_hash))),
            None => Ok(None),
        }
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        username: &Username,
        password_hash: &str,
        role: Role,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO loyalty.user_account (username, password_hash, role)
            VALUES ($1, $2, $3)
            RETURNING id, username, role, created_at, updated_at
            ",
        )
        .bind(username.as_str())
        .bind(password_hash)
        .bind(role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "username already exists"))?;

        row.try_into()
    }

    /// Change a user's role unless that demotes the last admin.
    ///
    /// The admin check and the update run in one transaction holding locks
    /// on every admin row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn update_role_keeping_admin(
        &self,
        id: UserId,
        role: Role,
    ) -> Result<AdminGuarded, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if !role.is_admin() && !leaves_an_admin(&lock_admins(&mut *tx).await?, id) {
            return Ok(AdminGuarded::LastAdmin);
        }

        let result = sqlx::query("UPDATE loyalty.user_account SET role = $1 WHERE id = $2")
            .bind(role)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(AdminGuarded::NotFound);
        }
        tx.commit().await?;
        Ok(AdminGuarded::Applied)
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE loyalty.user_account SET password_hash = $1 WHERE id = $2")
                .bind(password_hash)
                .bind(id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a user unless they are the last admin.
    ///
    /// The admin check and the delete run in one transaction holding locks
    /// on every admin row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn delete_keeping_admin(&self, id: UserId) -> Result<AdminGuarded, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if !leaves_an_admin(&lock_admins(&mut *tx).await?, id) {
            return Ok(AdminGuarded::LastAdmin);
        }

        let result = sqlx::query("DELETE FROM loyalty.user_account WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(AdminGuarded::NotFound);
        }
        tx.commit().await?;
        Ok(AdminGuarded::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_admin_cannot_be_removed() {
        assert!(!leaves_an_admin(&[4], UserId::new(4)));
    }

    #[test]
    fn test_admin_with_peers_can_be_removed() {
        assert!(leaves_an_admin(&[2, 4], UserId::new(4)));
    }

    #[test]
    fn test_non_admin_never_counts() {
        assert!(leaves_an_admin(&[4], UserId::new(9)));
        assert!(leaves_an_admin(&[], UserId::new(9)));
    }
}
