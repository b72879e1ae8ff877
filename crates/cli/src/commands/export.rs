//! Export command.
//!
//! Writes the same workbook as the admin panel's download: a `Users` sheet
//! without password hashes and a `Customers` sheet with balances.

use std::path::Path;

use loyalty_card_server::services::{SpreadsheetError, SpreadsheetService};
use thiserror::Error;

use super::{CommandError, connect};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Spreadsheet(#[from] SpreadsheetError),
}

/// Export users and customers to `path`.
pub async fn run(path: &Path) -> Result<(), ExportError> {
    let pool = connect().await?;

    let bytes = SpreadsheetService::new(&pool).export().await?;
    tokio::fs::write(path, &bytes)
        .await
        .map_err(CommandError::from)?;

    tracing::info!("Exported {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
