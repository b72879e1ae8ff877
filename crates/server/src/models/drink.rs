//! Drink catalog entries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use loyalty_card_core::DrinkId;

/// A drink offered on the order page.
#[derive(Debug, Clone, Serialize)]
pub struct Drink {
    pub id: DrinkId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
