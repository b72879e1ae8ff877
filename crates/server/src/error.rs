//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>` (plain-text bodies for pages)
//! or `Result<T, JsonError>` (`{"error": ...}` bodies for `/api`). Server
//! errors are captured to Sentry before responding; the client only sees a
//! generic message for them.

use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::orders::OrderError;
use crate::services::spreadsheet::SpreadsheetError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication or user management failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order workflow rejected the request.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Spreadsheet import/export failed.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] SpreadsheetError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::UserAlreadyExists | AuthError::LastAdmin => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidUsername(_)
                | AuthError::CannotDeleteSelf
                | AuthError::CannotChangeOwnRole => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Order(err) => match err {
                OrderError::CustomerNotFound(_) => StatusCode::NOT_FOUND,
                OrderError::InsufficientTokens { .. }
                | OrderError::InvalidQuantity(_)
                | OrderError::MissingDrink
                | OrderError::InvalidCode(_)
                | OrderError::Overflow => StatusCode::BAD_REQUEST,
                OrderError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Spreadsheet(err) => match err {
                SpreadsheetError::Read(_)
                | SpreadsheetError::NoWorksheet
                | SpreadsheetError::MissingColumn(_) => StatusCode::BAD_REQUEST,
                SpreadsheetError::Write(_) | SpreadsheetError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.status().is_server_error() {
            // Don't expose internal error details to clients
            return "Internal server error".to_string();
        }

        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Auth(AuthError::InvalidCredentials) => "Invalid credentials".to_string(),
            Self::Auth(err) => capitalize(&err.to_string()),
            Self::Order(err) => err.to_string(),
            Self::Spreadsheet(err) => capitalize(&err.to_string()),
            Self::NotFound(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Log and report server errors. Returns the status.
    fn report(&self) -> StatusCode {
        let status = self.status();
        if status.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }
        status
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.report();
        (status, self.public_message()).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(e) => Self::BadRequest(e.body_text()),
            other => Self::Internal(other.body_text()),
        }
    }
}

/// `AppError` rendered as a JSON body, for `/api` routes.
#[derive(Debug)]
pub struct JsonError(pub AppError);

impl<E> From<E> for JsonError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        let status = self.0.report();
        let body = serde_json::json!({ "error": self.0.public_message() });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the logged-in user.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
