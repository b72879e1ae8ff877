//! Customer token ledger.
//!
//! A customer carries three counters: total units ordered, tokens earned and
//! tokens redeemed. Ordering accrues one token per [`TOKEN_RATIO`] units of a
//! single order (remainders are dropped, not carried to the next order).
//! Redemption spends exactly the requested number of tokens and is refused
//! when the balance is too small.
//!
//! Invariant: `0 <= tokens_redeemed <= tokens_earned`, so the balance is never
//! negative. Every constructor and transition here preserves it.

use serde::{Deserialize, Serialize};

/// Units of a single order needed to earn one token.
pub const TOKEN_RATIO: i32 = 9;

/// Errors produced by ledger rules.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Quantity was zero, negative, or out of range.
    #[error("quantity must be a positive whole number (got {0})")]
    InvalidQuantity(i64),

    /// Redemption asked for more tokens than the customer holds.
    #[error("not enough tokens: requested {requested}, available {available}")]
    InsufficientTokens {
        /// Tokens the request tried to redeem.
        requested: i32,
        /// Balance at the time of the request.
        available: i32,
    },

    /// A counter was negative.
    #[error("{0} cannot be negative")]
    NegativeCounter(&'static str),

    /// More tokens were redeemed than earned.
    #[error("tokens_redeemed ({redeemed}) exceeds tokens_earned ({earned})")]
    Overdrawn {
        /// Tokens earned.
        earned: i32,
        /// Tokens redeemed.
        redeemed: i32,
    },

    /// A counter would exceed its storage range.
    #[error("counter overflow")]
    Overflow,
}

/// A strictly positive order or redemption quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    /// Validate a raw quantity.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidQuantity` if the value is not in `1..=i32::MAX`.
    pub fn new(value: i64) -> Result<Self, LedgerError> {
        match i32::try_from(value) {
            Ok(v) if v > 0 => Ok(Self(v)),
            _ => Err(LedgerError::InvalidQuantity(value)),
        }
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Tokens earned by ordering this many units in one order.
    #[must_use]
    pub const fn tokens_earned(self) -> i32 {
        self.0 / TOKEN_RATIO
    }
}

impl TryFrom<i64> for Quantity {
    type Error = LedgerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The loyalty counters of one customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TokenLedger {
    total_orders: i32,
    tokens_earned: i32,
    tokens_redeemed: i32,
}

impl TokenLedger {
    /// Build a ledger from stored counters, checking the invariant.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NegativeCounter` if any counter is negative, or
    /// `LedgerError::Overdrawn` if more tokens were redeemed than earned.
    pub const fn new(
        total_orders: i32,
        tokens_earned: i32,
        tokens_redeemed: i32,
    ) -> Result<Self, LedgerError> {
        if total_orders < 0 {
            return Err(LedgerError::NegativeCounter("total_orders"));
        }
        if tokens_earned < 0 {
            return Err(LedgerError::NegativeCounter("tokens_earned"));
        }
        if tokens_redeemed < 0 {
            return Err(LedgerError::NegativeCounter("tokens_redeemed"));
        }
        if tokens_redeemed > tokens_earned {
            return Err(LedgerError::Overdrawn {
                earned: tokens_earned,
                redeemed: tokens_redeemed,
            });
        }

        Ok(Self {
            total_orders,
            tokens_earned,
            tokens_redeemed,
        })
    }

    /// Total units ordered.
    #[must_use]
    pub const fn total_orders(&self) -> i32 {
        self.total_orders
    }

    /// Tokens earned over the customer's lifetime.
    #[must_use]
    pub const fn tokens_earned(&self) -> i32 {
        self.tokens_earned
    }

    /// Tokens spent so far.
    #[must_use]
    pub const fn tokens_redeemed(&self) -> i32 {
        self.tokens_redeemed
    }

    /// Tokens currently available to redeem.
    #[must_use]
    pub const fn balance(&self) -> i32 {
        self.tokens_earned - self.tokens_redeemed
    }

    /// Tokens an order of `quantity` units earns.
    #[must_use]
    pub const fn tokens_for(quantity: Quantity) -> i32 {
        quantity.tokens_earned()
    }

    /// Record an order of `quantity` units.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Overflow` if a counter would exceed `i32::MAX`.
    pub fn accrue(self, quantity: Quantity) -> Result<Self, LedgerError> {
        let total_orders = self
            .total_orders
            .checked_add(quantity.get())
            .ok_or(LedgerError::Overflow)?;
        let tokens_earned = self
            .tokens_earned
            .checked_add(quantity.tokens_earned())
            .ok_or(LedgerError::Overflow)?;

        Ok(Self {
            total_orders,
            tokens_earned,
            ..self
        })
    }

    /// Spend `quantity` tokens.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InsufficientTokens` if the balance is smaller
    /// than `quantity`; the ledger is left untouched.
    pub const fn redeem(self, quantity: Quantity) -> Result<Self, LedgerError> {
        let available = self.balance();
        if available < quantity.get() {
            return Err(LedgerError::InsufficientTokens {
                requested: quantity.get(),
                available,
            });
        }

        Ok(Self {
            tokens_redeemed: self.tokens_redeemed + quantity.get(),
            ..self
        })
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
    fn test_quantity_rejects_non_positive() {
        assert_eq!(Quantity::new(0), Err(LedgerError::InvalidQuantity(0)));
        assert_eq!(Quantity::new(-3), Err(LedgerError::InvalidQuantity(-3)));
    }

    #[test]
    fn test_quantity_rejects_out_of_range() {
        let too_big = i64::from(i32::MAX) + 1;
        assert_eq!(
            Quantity::new(too_big),
            Err(LedgerError::InvalidQuantity(too_big))
        );
    }

    #[test]
    fn test_quantity_deserialize_validates() {
        let q: Quantity = serde_json::from_str("27").unwrap();
        assert_eq!(q.get(), 27);
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert!(serde_json::from_str::<Quantity>("-1").is_err());
    }

    #[test]
    fn test_tokens_truncate_remainder() {
        assert_eq!(qty(1).tokens_earned(), 0);
        assert_eq!(qty(8).tokens_earned(), 0);
        assert_eq!(qty(9).tokens_earned(), 1);
        assert_eq!(qty(17).tokens_earned(), 1);
        assert_eq!(qty(18).tokens_earned(), 2);
    }

    #[test]
    fn test_new_rejects_broken_invariants() {
        assert_eq!(
            TokenLedger::new(-1, 0, 0),
            Err(LedgerError::NegativeCounter("total_orders"))
        );
        assert_eq!(
            TokenLedger::new(0, -1, 0),
            Err(LedgerError::NegativeCounter("tokens_earned"))
        );
        assert_eq!(
            TokenLedger::new(0, 0, -1),
            Err(LedgerError::NegativeCounter("tokens_redeemed"))
        );
        assert_eq!(
            TokenLedger::new(0, 2, 3),
            Err(LedgerError::Overdrawn {
                earned: 2,
                redeemed: 3
            })
        );
    }

    #[test]
    fn test_accrue_27_units() {
        let ledger = TokenLedger::new(4, 1, 0).unwrap();
        let after = ledger.accrue(qty(27)).unwrap();
        assert_eq!(after.total_orders(), 31);
        assert_eq!(after.tokens_earned(), 4);
        assert_eq!(after.tokens_redeemed(), 0);
    }

    #[test]
    fn test_accrue_multiples_of_ratio() {
        for k in 1..=20_i32 {
            for extra in 0..TOKEN_RATIO {
                let q = 9 * k + extra;
                let after = TokenLedger::default()
                    .accrue(qty(i64::from(q)))
                    .unwrap();
                assert_eq!(after.total_orders(), q);
                assert_eq!(after.tokens_earned(), q / 9);
            }
        }
    }

    #[test]
    fn test_accrue_does_not_carry_remainders() {
        let after = TokenLedger::default()
            .accrue(qty(5))
            .unwrap()
            .accrue(qty(5))
            .unwrap();
        assert_eq!(after.total_orders(), 10);
        assert_eq!(after.tokens_earned(), 0);
    }

    #[test]
    fn test_accrue_overflow() {
        let ledger = TokenLedger::new(i32::MAX - 1, 0, 0).unwrap();
        assert_eq!(ledger.accrue(qty(2)), Err(LedgerError::Overflow));
    }

    #[test]
    fn test_redeem_exact_balance() {
        let ledger = TokenLedger::new(45, 5, 2).unwrap();
        assert_eq!(ledger.balance(), 3);

        let after = ledger.redeem(qty(3)).unwrap();
        assert_eq!(after.tokens_redeemed(), 5);
        assert_eq!(after.balance(), 0);
        assert_eq!(after.total_orders(), 45);
        assert_eq!(after.tokens_earned(), 5);
    }

    #[test]
    fn test_redeem_more_than_balance() {
        let ledger = TokenLedger::new(45, 5, 2).unwrap();
        assert_eq!(
            ledger.redeem(qty(4)),
            Err(LedgerError::InsufficientTokens {
                requested: 4,
                available: 3
            })
        );
    }

    #[test]
    fn test_redeem_keeps_invariant() {
        let mut ledger = TokenLedger::new(90, 10, 0).unwrap();
        while let Ok(next) = ledger.redeem(qty(3)) {
            assert!(next.tokens_redeemed() <= next.tokens_earned());
            ledger = next;
        }
        assert_eq!(ledger.tokens_redeemed(), 9);
        assert_eq!(ledger.balance(), 1);
    }
}
