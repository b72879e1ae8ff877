//! Customer import command.
//!
//! Reads the first worksheet of an xlsx workbook. Rows with a missing name
//! or code are dropped, rows with broken counters are reported and skipped,
//! and the rest are inserted in one transaction.

use std::path::Path;

use loyalty_card_server::services::{SpreadsheetError, SpreadsheetService};
use thiserror::Error;

use super::{CommandError, connect};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Spreadsheet(#[from] SpreadsheetError),
}

/// Import customers from `path`.
pub async fn import(path: &Path) -> Result<(), ImportError> {
    let bytes = tokio::fs::read(path).await.map_err(CommandError::from)?;
    let pool = connect().await?;

    tracing::info!("Importing customers from {}", path.display());
    let summary = SpreadsheetService::new(&pool).import(bytes).await?;

    for skipped in &summary.skipped {
        tracing::warn!(row = skipped.row, reason = %skipped.reason, "Row skipped");
    }
    tracing::info!("{}", summary.message());

    Ok(())
}
