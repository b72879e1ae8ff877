//! Business logic services.
//!
//! - `auth` - Password login and user management
//! - `orders` - Order accrual and token redemption
//! - `spreadsheet` - Customer import and state export

pub mod auth;
pub mod orders;
pub mod spreadsheet;

pub use auth::{AuthError, AuthService};
pub use orders::{OrderError, OrderOutcome, OrderRequest, OrderService, QuantityInput};
pub use spreadsheet::{ImportSummary, SpreadsheetError, SpreadsheetService};
