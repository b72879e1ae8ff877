//! Database migration command.
//!
//! Applies the migrations embedded from `crates/server/migrations/`. The
//! server does the same at startup, so this is only needed when preparing a
//! database ahead of a deploy.

use thiserror::Error;

use loyalty_card_server::db;

use super::{CommandError, connect};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run pending migrations.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    db::run_migrations(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
