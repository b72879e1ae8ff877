//! Order and redemption workflow.
//!
//! An order either accrues units and tokens or spends tokens from the
//! customer's balance. The arithmetic rule lives in
//! [`loyalty_card_core::TokenLedger`]; persistence goes through one atomic
//! statement per request in [`CustomerRepository`].

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use loyalty_card_core::{
    CustomerId, LedgerError, Quantity, TokenLedger, UniqueCode, UniqueCodeError, Username,
};

use crate::db::{CustomerRepository, Redemption, RepositoryError};
use crate::models::customer::{Customer, CustomerSummary};

/// Errors produced by the order workflow.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No customer has the given ID.
    #[error("Customer not found")]
    CustomerNotFound(CustomerId),

    /// The balance does not cover the redemption.
    #[error("Not enough tokens: requested {requested}, available {available}")]
    InsufficientTokens { requested: i32, available: i32 },

    /// Quantity was not a whole number, or was zero, negative, or too large.
    /// Carries the input as submitted.
    #[error("Quantity must be a positive whole number")]
    InvalidQuantity(String),

    /// No drink was named.
    #[error("A drink must be selected")]
    MissingDrink,

    /// The lookup code was empty or too long.
    #[error("Invalid customer code: {0}")]
    InvalidCode(#[from] UniqueCodeError),

    /// A counter would exceed its storage range.
    #[error("Order would overflow the customer's counters")]
    Overflow,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<LedgerError> for OrderError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InvalidQuantity(q) => Self::InvalidQuantity(q.to_string()),
            LedgerError::InsufficientTokens {
                requested,
                available,
            } => Self::InsufficientTokens {
                requested,
                available,
            },
            LedgerError::Overflow => Self::Overflow,
            other @ (LedgerError::NegativeCounter(_) | LedgerError::Overdrawn { .. }) => {
                Self::Repository(RepositoryError::DataCorruption(other.to_string()))
            }
        }
    }
}

/// Quantity as submitted.
///
/// JSON clients may send a number or a numeric string; the order form always
/// sends text. Anything else is kept verbatim so it is refused as an invalid
/// quantity rather than as a malformed body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum QuantityInput {
    Whole(i64),
    Text(String),
    Other(serde_json::Value),
}

impl QuantityInput {
    /// Validate into a [`Quantity`].
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidQuantity` carrying the raw input if it is
    /// not a whole number in `1..=i32::MAX`.
    pub fn parse(&self) -> Result<Quantity, OrderError> {
        let value = match self {
            Self::Whole(n) => *n,
            Self::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| OrderError::InvalidQuantity(text.clone()))?,
            Self::Other(value) => return Err(OrderError::InvalidQuantity(value.to_string())),
        };
        Ok(Quantity::new(value)?)
    }
}

impl std::fmt::Display for QuantityInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Whole(n) => write!(f, "{n}"),
            Self::Text(text) => f.write_str(text),
            Self::Other(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for QuantityInput {
    fn from(n: i64) -> Self {
        Self::Whole(n)
    }
}

/// An order as submitted from the order page or the API.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    pub customer_id: CustomerId,
    pub drink_name: String,
    pub quantity: QuantityInput,
    #[serde(default)]
    pub redeem: bool,
}

/// Which path an order took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    Accrual,
    Redemption,
}

/// Result of a successful order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderOutcome {
    pub kind: OrderKind,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub drink_name: String,
    pub quantity: i32,
    /// Tokens this order earned (zero for redemptions).
    pub tokens_earned: i32,
    /// Tokens this order spent (zero for accruals).
    pub tokens_redeemed: i32,
    /// Counters before the order.
    pub previous: TokenLedger,
    /// Counters after the order.
    pub updated: TokenLedger,
    pub token_balance: i32,
}

impl OrderOutcome {
    /// One-line confirmation for the order page.
    #[must_use]
    pub fn message(&self) -> String {
        match self.kind {
            OrderKind::Accrual => format!(
                "{} x {} recorded for {}: +{} tokens (balance {})",
                self.quantity,
                self.drink_name,
                self.customer_name,
                self.tokens_earned,
                self.token_balance
            ),
            OrderKind::Redemption => format!(
                "{} tokens redeemed by {} for {} (balance {})",
                self.tokens_redeemed, self.customer_name, self.drink_name, self.token_balance
            ),
        }
    }
}

/// Order workflow service.
pub struct OrderService<'a> {
    customers: CustomerRepository<'a>,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            customers: CustomerRepository::new(pool),
        }
    }

    /// Apply an order or redemption to a customer.
    ///
    /// Nothing is written unless the whole request succeeds.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidQuantity` unless the quantity is a positive
    /// whole number.
    /// Returns `OrderError::MissingDrink` if no drink is named.
    /// Returns `OrderError::CustomerNotFound` if the customer doesn't exist.
    /// Returns `OrderError::InsufficientTokens` if a redemption exceeds the balance.
    /// Returns `OrderError::Overflow` if a counter would overflow.
    pub async fn submit(
        &self,
        request: &OrderRequest,
        submitted_by: &Username,
    ) -> Result<OrderOutcome, OrderError> {
        let quantity = request.quantity.parse().inspect_err(|_| {
            tracing::warn!(
                customer_id = %request.customer_id,
                quantity = %request.quantity,
                submitted_by = %submitted_by,
                "Order rejected: invalid quantity"
            );
        })?;
        let drink_name = request.drink_name.trim();
        if drink_name.is_empty() {
            return Err(OrderError::MissingDrink);
        }

        let result = self.apply(request.customer_id, quantity, request.redeem).await;

        match &result {
            Ok(customer) => tracing::info!(
                customer_id = %request.customer_id,
                drink = %drink_name,
                quantity = quantity.get(),
                redeem = request.redeem,
                submitted_by = %submitted_by,
                balance = customer.ledger.balance(),
                "Order recorded"
            ),
            Err(e) => tracing::warn!(
                customer_id = %request.customer_id,
                drink = %drink_name,
                quantity = quantity.get(),
                redeem = request.redeem,
                submitted_by = %submitted_by,
                error = %e,
                "Order rejected"
            ),
        }

        let customer = result?;
        let kind = if request.redeem {
            OrderKind::Redemption
        } else {
            OrderKind::Accrual
        };
        let previous = previous_ledger(kind, quantity, customer.ledger)?;

        Ok(OrderOutcome {
            kind,
            customer_id: customer.id,
            customer_name: customer.name,
            drink_name: drink_name.to_owned(),
            quantity: quantity.get(),
            tokens_earned: customer.ledger.tokens_earned() - previous.tokens_earned(),
            tokens_redeemed: customer.ledger.tokens_redeemed() - previous.tokens_redeemed(),
            previous,
            updated: customer.ledger,
            token_balance: customer.ledger.balance(),
        })
    }

    async fn apply(
        &self,
        id: CustomerId,
        quantity: Quantity,
        redeem: bool,
    ) -> Result<Customer, OrderError> {
        if redeem {
            match self.customers.redeem(id, quantity).await? {
                Redemption::Redeemed(customer) => Ok(customer),
                Redemption::NotFound => Err(OrderError::CustomerNotFound(id)),
                Redemption::Insufficient(e) => Err(e.into()),
            }
        } else {
            self.customers
                .accrue(id, quantity)
                .await
                .map_err(|e| match e {
                    RepositoryError::OutOfRange => OrderError::Overflow,
                    other => OrderError::Repository(other),
                })?
                .ok_or(OrderError::CustomerNotFound(id))
        }
    }

    /// Current counters of one customer.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::CustomerNotFound` if the customer doesn't exist.
    pub async fn summary(&self, id: CustomerId) -> Result<CustomerSummary, OrderError> {
        self.customers
            .get_by_id(id)
            .await?
            .map(|c| c.summary())
            .ok_or(OrderError::CustomerNotFound(id))
    }

    /// Customers whose card carries `code`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidCode` if the code is empty or too long.
    pub async fn lookup(&self, code: &str) -> Result<Vec<CustomerSummary>, OrderError> {
        let code = UniqueCode::parse(code)?;
        let customers = self.customers.find_by_code(&code).await?;
        Ok(customers.iter().map(Customer::summary).collect())
    }
}

/// Rebuild the counters as they were before an order.
fn previous_ledger(
    kind: OrderKind,
    quantity: Quantity,
    updated: TokenLedger,
) -> Result<TokenLedger, OrderError> {
    let previous = match kind {
        OrderKind::Accrual => TokenLedger::new(
            updated.total_orders() - quantity.get(),
            updated.tokens_earned() - TokenLedger::tokens_for(quantity),
            updated.tokens_redeemed(),
        ),
        OrderKind::Redemption => TokenLedger::new(
            updated.total_orders(),
            updated.tokens_earned(),
            updated.tokens_redeemed() - quantity.get(),
        ),
    };
    Ok(previous?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[test]
    fn test_previous_ledger_for_accrual() {
        let updated = TokenLedger::new(31, 4, 0).unwrap();
        let previous = previous_ledger(OrderKind::Accrual, qty(27), updated).unwrap();
        assert_eq!(previous, TokenLedger::new(4, 1, 0).unwrap());
    }

    #[test]
    fn test_previous_ledger_for_redemption() {
        let updated = TokenLedger::new(45, 5, 5).unwrap();
        let previous = previous_ledger(OrderKind::Redemption, qty(3), updated).unwrap();
        assert_eq!(previous.balance(), 3);
        assert_eq!(previous.tokens_redeemed(), 2);
    }

    #[test]
    fn test_previous_ledger_rejects_impossible_state() {
        // 3 units on record cannot follow an order of 5.
        let updated = TokenLedger::new(3, 0, 0).unwrap();
        assert!(matches!(
            previous_ledger(OrderKind::Accrual, qty(5), updated),
            Err(OrderError::Repository(RepositoryError::DataCorruption(_)))
        ));
    }

    #[test]
    fn test_ledger_error_mapping() {
        assert!(matches!(
            OrderError::from(LedgerError::InvalidQuantity(0)),
            OrderError::InvalidQuantity(q) if q == "0"
        ));
        assert!(matches!(
            OrderError::from(LedgerError::InsufficientTokens {
                requested: 4,
                available: 3
            }),
            OrderError::InsufficientTokens {
                requested: 4,
                available: 3
            }
        ));
        assert!(matches!(
            OrderError::from(LedgerError::Overflow),
            OrderError::Overflow
        ));
    }

    #[test]
    fn test_order_request_redeem_defaults_to_false() {
        let req: OrderRequest =
            serde_json::from_str(r#"{"customer_id": 1, "drink_name": "Latte", "quantity": 9}"#)
                .unwrap();
        assert!(!req.redeem);
        assert_eq!(req.customer_id, CustomerId::new(1));
    }

    fn invalid_input(err: OrderError) -> String {
        match err {
            OrderError::InvalidQuantity(raw) => raw,
            other => panic!("expected InvalidQuantity, got {other:?}"),
        }
    }

    #[test]
    fn test_quantity_accepts_whole_numbers() {
        assert_eq!(QuantityInput::Whole(27).parse().unwrap().get(), 27);
        assert_eq!(
            QuantityInput::Text(" 9 ".to_string()).parse().unwrap().get(),
            9
        );
    }

    #[test]
    fn test_quantity_keeps_raw_input_when_invalid() {
        assert_eq!(
            invalid_input(QuantityInput::Text("two".to_string()).parse().unwrap_err()),
            "two"
        );
        assert_eq!(
            invalid_input(QuantityInput::Text("1.5".to_string()).parse().unwrap_err()),
            "1.5"
        );
        assert_eq!(invalid_input(QuantityInput::Whole(0).parse().unwrap_err()), "0");
        assert_eq!(invalid_input(QuantityInput::Whole(-4).parse().unwrap_err()), "-4");
        let too_big = i64::from(i32::MAX) + 1;
        assert_eq!(
            invalid_input(QuantityInput::Whole(too_big).parse().unwrap_err()),
            too_big.to_string()
        );
    }

    #[test]
    fn test_non_integer_json_quantity_is_invalid_quantity() {
        for raw in ["1.5", "18446744073709551615", "true", "null", "[3]"] {
            let body = format!(r#"{{"customer_id": 1, "drink_name": "Latte", "quantity": {raw}}}"#);
            let req: OrderRequest = serde_json::from_str(&body).unwrap();
            let err = req.quantity.parse().unwrap_err();
            assert_eq!(invalid_input(err), raw, "quantity {raw}");
        }

        let req: OrderRequest = serde_json::from_str(
            r#"{"customer_id": 1, "drink_name": "Latte", "quantity": "3"}"#,
        )
        .unwrap();
        assert_eq!(req.quantity.parse().unwrap().get(), 3);
    }

    #[test]
    fn test_outcome_message() {
        let outcome = OrderOutcome {
            kind: OrderKind::Accrual,
            customer_id: CustomerId::new(1),
            customer_name: "Ada".to_string(),
            drink_name: "Latte".to_string(),
            quantity: 27,
            tokens_earned: 3,
            tokens_redeemed: 0,
            previous: TokenLedger::default(),
            updated: TokenLedger::new(27, 3, 0).unwrap(),
            token_balance: 3,
        };
        assert_eq!(
            outcome.message(),
            "27 x Latte recorded for Ada: +3 tokens (balance 3)"
        );
    }
}
