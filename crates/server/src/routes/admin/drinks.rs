//! Drink catalog actions.

use axum::{extract::State, response::Redirect};
use serde::Deserialize;

use loyalty_card_core::DrinkId;

use super::{finish, redirect_error};
use crate::db::DrinkRepository;
use crate::error::AppError;
use crate::extract::PageForm;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateDrinkForm {
    pub drink_name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteDrinkForm {
    pub drink_id: DrinkId,
}

/// `POST /admin/drinks`
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    PageForm(form): PageForm<CreateDrinkForm>,
) -> Result<Redirect, AppError> {
    let name = form.drink_name.trim();
    if name.is_empty() {
        return Ok(redirect_error("Drink name is required"));
    }

    let result = DrinkRepository::new(state.pool()).create(name).await;
    if let Ok(drink) = &result {
        tracing::info!(actor = %admin.id, drink_id = %drink.id, "Drink added");
    }

    finish(result, |d| format!("Drink {} added", d.name))
}

/// `POST /admin/drinks/delete`
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    PageForm(form): PageForm<DeleteDrinkForm>,
) -> Result<Redirect, AppError> {
    let result = DrinkRepository::new(state.pool()).delete(form.drink_id).await;
    if result.is_ok() {
        tracing::info!(actor = %admin.id, drink_id = %form.drink_id, "Drink deleted");
    }

    finish(result, |()| "Drink deleted".to_string())
}
