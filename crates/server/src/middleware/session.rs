//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::ServerConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "loyalty_session";

/// Session expiry time in seconds (24 hours of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Build the `PostgreSQL` store over the `loyalty.session` table.
///
/// # Errors
///
/// Returns an error message if the schema or table name is rejected.
pub fn postgres_store(pool: &PgPool) -> Result<PostgresStore, String> {
    PostgresStore::new(pool.clone())
        .with_schema_name("loyalty")?
        .with_table_name("session")
}

/// Create the session layer with `PostgreSQL` store.
///
/// # Errors
///
/// Returns an error message if the store cannot be configured.
pub fn create_session_layer(
    pool: &PgPool,
    config: &ServerConfig,
) -> Result<SessionManagerLayer<PostgresStore>, String> {
    Ok(session_layer(postgres_store(pool)?, config.is_secure()))
}

/// Apply cookie settings to a session layer over any store.
#[must_use]
pub fn session_layer<S: SessionStore>(store: S, secure: bool) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}
