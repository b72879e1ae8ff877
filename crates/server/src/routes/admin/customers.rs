//! Customer management actions.

use axum::{
    extract::{Multipart, State},
    response::Redirect,
};
use serde::Deserialize;

use loyalty_card_core::{CustomerId, TokenLedger, UniqueCode};

use super::{finish, redirect_error};
use crate::db::CustomerRepository;
use crate::error::AppError;
use crate::extract::PageForm;
use crate::middleware::RequireAdmin;
use crate::models::NewCustomer;
use crate::services::spreadsheet::SpreadsheetService;
use crate::state::AppState;

/// Multipart field carrying the uploaded workbook.
const IMPORT_FIELD: &str = "excel_file";

/// New customer form. Counters start at zero.
#[derive(Debug, Deserialize)]
pub struct CreateCustomerForm {
    pub name: String,
    pub unique_id: String,
}

/// Customer deletion form.
#[derive(Debug, Deserialize)]
pub struct DeleteCustomerForm {
    pub customer_id: CustomerId,
}

/// `POST /admin/customers`
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    PageForm(form): PageForm<CreateCustomerForm>,
) -> Result<Redirect, AppError> {
    let name = form.name.trim();
    if name.is_empty() {
        return Ok(redirect_error("Customer name is required"));
    }
    let unique_id = match UniqueCode::parse(&form.unique_id) {
        Ok(code) => code,
        Err(e) => return Ok(redirect_error(&format!("Invalid unique ID: {e}"))),
    };

    let customer = NewCustomer {
        name: name.to_owned(),
        unique_id,
        ledger: TokenLedger::default(),
    };
    let result = CustomerRepository::new(state.pool()).create(&customer).await;
    if let Ok(created) = &result {
        tracing::info!(actor = %admin.id, customer_id = %created.id, "Customer created");
    }

    finish(result, |c| format!("Customer {} ({}) added", c.name, c.unique_id))
}

/// `POST /admin/customers/delete`
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    PageForm(form): PageForm<DeleteCustomerForm>,
) -> Result<Redirect, AppError> {
    let result = CustomerRepository::new(state.pool())
        .delete(form.customer_id)
        .await;
    if result.is_ok() {
        tracing::info!(actor = %admin.id, customer_id = %form.customer_id, "Customer deleted");
    }

    finish(result, |()| "Customer deleted".to_string())
}

/// `POST /admin/customers/import`
pub async fn import(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?
    {
        if field.name() == Some(IMPORT_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?;
            upload = Some(bytes.to_vec());
            break;
        }
    }

    let Some(bytes) = upload.filter(|b| !b.is_empty()) else {
        return Ok(redirect_error("No file uploaded"));
    };

    tracing::info!(actor = %admin.id, size = bytes.len(), "Importing customers");
    let result = SpreadsheetService::new(state.pool()).import(bytes).await;

    finish(result, |summary| summary.message())
}
