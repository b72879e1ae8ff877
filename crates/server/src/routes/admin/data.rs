//! Workbook export.

use axum::{
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
};
use chrono::Local;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::services::spreadsheet::{SpreadsheetService, XLSX_CONTENT_TYPE, export_filename};
use crate::state::AppState;

/// `GET /admin/export`
pub async fn export(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = SpreadsheetService::new(state.pool()).export().await?;
    let filename = export_filename(Local::now().naive_local());

    tracing::info!(actor = %admin.id, %filename, size = bytes.len(), "Exported workbook");

    Ok((
        [
            (CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    ))
}
