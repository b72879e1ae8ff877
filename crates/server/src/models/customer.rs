//! Customer types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use loyalty_card_core::{CustomerId, TokenLedger, UniqueCode};

/// A loyalty customer with their token counters.
#[derive(Debug, Clone)]
pub struct Customer {
    /// Database ID.
    pub id: CustomerId,
    /// Display name.
    pub name: String,
    /// Short lookup code printed on the card. Not unique across customers.
    pub unique_id: UniqueCode,
    /// Order and token counters.
    pub ledger: TokenLedger,
    /// When the customer was created.
    pub created_at: DateTime<Utc>,
    /// When the counters or profile last changed.
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Read-only view used by the summary endpoint and the order page.
    #[must_use]
    pub fn summary(&self) -> CustomerSummary {
        CustomerSummary {
            id: self.id,
            name: self.name.clone(),
            unique_id: self.unique_id.as_str().to_owned(),
            total_orders: self.ledger.total_orders(),
            tokens_earned: self.ledger.tokens_earned(),
            tokens_redeemed: self.ledger.tokens_redeemed(),
            token_balance: self.ledger.balance(),
        }
    }
}

/// Fields for inserting a customer.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub unique_id: UniqueCode,
    pub ledger: TokenLedger,
}

/// Serializable snapshot of a customer's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSummary {
    pub id: CustomerId,
    pub name: String,
    pub unique_id: String,
    pub total_orders: i32,
    pub tokens_earned: i32,
    pub tokens_redeemed: i32,
    pub token_balance: i32,
}
