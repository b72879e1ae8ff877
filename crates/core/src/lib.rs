//! Loyalty Card Core - Shared domain types.
//!
//! This crate provides the types and rules used across all loyalty card components:
//! - `server` - HTTP service for staff order entry and admin management
//! - `cli` - Command-line tools for migrations, user bootstrap, import/export
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. The token accrual and redemption rules live here so that the
//! server, the CLI and the tests all share a single definition.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, usernames, customer codes and roles
//! - [`ledger`] - Customer token ledger with accrual and redemption rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod ledger;
pub mod types;

pub use ledger::{LedgerError, Quantity, TOKEN_RATIO, TokenLedger};
pub use types::*;
