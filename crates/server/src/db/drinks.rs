//! Drink catalog repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use loyalty_card_core::DrinkId;

use super::RepositoryError;
use crate::models::drink::Drink;

#[derive(Debug, sqlx::FromRow)]
struct DrinkRow {
    id: i32,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<DrinkRow> for Drink {
    fn from(row: DrinkRow) -> Self {
        Self {
            id: DrinkId::new(row.id),
            name: row.name,
            created_at: row.created_at,
        }
    }
}

/// Repository for the drink catalog.
pub struct DrinkRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DrinkRepository<'a> {
    /// Create a new drink repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all drinks ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Drink>, RepositoryError> {
        let rows = sqlx::query_as::<_, DrinkRow>(
            "SELECT id, name, created_at FROM loyalty.drink ORDER BY name, id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Add a drink.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, name: &str) -> Result<Drink, RepositoryError> {
        let row = sqlx::query_as::<_, DrinkRow>(
            "INSERT INTO loyalty.drink (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Remove a drink.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the drink doesn't exist.
    pub async fn delete(&self, id: DrinkId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM loyalty.drink WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
