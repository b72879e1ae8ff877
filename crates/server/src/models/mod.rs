//! Domain models for the loyalty service.
//!
//! Validated domain objects built from database rows. Row structs live next
//! to their repositories in [`crate::db`].

pub mod customer;
pub mod drink;
pub mod session;
pub mod user;

pub use customer::{Customer, CustomerSummary, NewCustomer};
pub use drink::Drink;
pub use session::CurrentUser;
pub use user::User;
pub use session::keys as session_keys;
