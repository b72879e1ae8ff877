//! Customer repository.
//!
//! Counter updates are single conditional statements so concurrent orders
//! against one customer never interleave a read and a write. The table's
//! CHECK constraints back the ledger invariant.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use loyalty_card_core::{CustomerId, LedgerError, Quantity, TokenLedger, UniqueCode};

use super::RepositoryError;
use crate::models::customer::{Customer, NewCustomer};

const CUSTOMER_COLUMNS: &str = "id, name, unique_id, total_orders, tokens_earned, \
                                tokens_redeemed, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    name: String,
    unique_id: String,
    total_orders: i32,
    tokens_earned: i32,
    tokens_redeemed: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let unique_id = UniqueCode::parse(&row.unique_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid unique_id in database: {e}"))
        })?;
        let ledger = TokenLedger::new(row.total_orders, row.tokens_earned, row.tokens_redeemed)
            .map_err(|e| {
                RepositoryError::DataCorruption(format!(
                    "customer {} has invalid counters: {e}",
                    row.id
                ))
            })?;

        Ok(Self {
            id: CustomerId::new(row.id),
            name: row.name,
            unique_id,
            ledger,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Refusal for a redemption the conditional update rejected.
///
/// `balance` comes from a later read, which an accrual may have raised in
/// between, so the reported figure is capped below `quantity`.
fn shortfall(quantity: Quantity, balance: i32) -> LedgerError {
    LedgerError::InsufficientTokens {
        requested: quantity.get(),
        available: balance.min(quantity.get() - 1),
    }
}

/// Result of a redemption attempt.
#[derive(Debug)]
pub enum Redemption {
    /// Tokens were spent; holds the updated customer.
    Redeemed(Customer),
    /// No customer with that ID.
    NotFound,
    /// The customer exists but holds fewer tokens than requested.
    Insufficient(LedgerError),
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for customer database operations.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all customers ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn list_all(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM loyalty.customer ORDER BY name, id"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM loyalty.customer WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Find every customer carrying `code`. Codes are not unique, so this
    /// may return several customers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_code(&self, code: &UniqueCode) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM loyalty.customer WHERE unique_id = $1 ORDER BY name, id"
        ))
        .bind(code.as_str())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Insert a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the counters violate a CHECK constraint.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, customer: &NewCustomer) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            INSERT INTO loyalty.customer
                (name, unique_id, total_orders, tokens_earned, tokens_redeemed)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(&customer.name)
        .bind(customer.unique_id.as_str())
        .bind(customer.ledger.total_orders())
        .bind(customer.ledger.tokens_earned())
        .bind(customer.ledger.tokens_redeemed())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "customer counters rejected"))?;

        row.try_into()
    }

    /// Insert many customers in one transaction. Either every row is stored
    /// or none is.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if any row violates a constraint.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_many(&self, customers: &[NewCustomer]) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for customer in customers {
            sqlx::query(
                r"
                INSERT INTO loyalty.customer
                    (name, unique_id, total_orders, tokens_earned, tokens_redeemed)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(&customer.name)
            .bind(customer.unique_id.as_str())
            .bind(customer.ledger.total_orders())
            .bind(customer.ledger.tokens_earned())
            .bind(customer.ledger.tokens_redeemed())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_write(e, "customer counters rejected"))?;
            inserted += 1;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Delete a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer doesn't exist.
    pub async fn delete(&self, id: CustomerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM loyalty.customer WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Add an order of `quantity` units to a customer's counters.
    ///
    /// Returns `None` if no customer has this ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::OutOfRange` if a counter would overflow.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn accrue(
        &self,
        id: CustomerId,
        quantity: Quantity,
    ) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            UPDATE loyalty.customer
            SET total_orders = total_orders + $1,
                tokens_earned = tokens_earned + $2
            WHERE id = $3
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(quantity.get())
        .bind(TokenLedger::tokens_for(quantity))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "customer counters rejected"))?;

        row.map(TryInto::try_into).transpose()
    }

    /// Spend `quantity` tokens if the customer's balance covers them.
    ///
    /// The balance check and the increment happen in one statement. When
    /// nothing is updated a follow-up read tells a missing customer apart
    /// from a short balance.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn redeem(
        &self,
        id: CustomerId,
        quantity: Quantity,
    ) -> Result<Redemption, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            UPDATE loyalty.customer
            SET tokens_redeemed = tokens_redeemed + $1
            WHERE id = $2 AND tokens_earned - tokens_redeemed >= $1
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(quantity.get())
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "customer counters rejected"))?;

        if let Some(row) = row {
            return Ok(Redemption::Redeemed(row.try_into()?));
        }

        match self.get_by_id(id).await? {
            None => Ok(Redemption::NotFound),
            Some(customer) => Ok(Redemption::Insufficient(shortfall(
                quantity,
                customer.ledger.balance(),
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[test]
    fn test_shortfall_reports_balance() {
        assert_eq!(
            shortfall(qty(4), 3),
            LedgerError::InsufficientTokens {
                requested: 4,
                available: 3
            }
        );
    }

    #[test]
    fn test_shortfall_never_claims_enough() {
        // An accrual landed between the refused update and the read
        assert_eq!(
            shortfall(qty(4), 9),
            LedgerError::InsufficientTokens {
                requested: 4,
                available: 3
            }
        );
        assert_eq!(
            shortfall(qty(1), 1),
            LedgerError::InsufficientTokens {
                requested: 1,
                available: 0
            }
        );
    }
}
