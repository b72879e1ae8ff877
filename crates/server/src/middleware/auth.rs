//! Authentication extractors.
//!
//! Handlers receive the logged-in user through these extractors instead of
//! reading the session themselves. The session only names the account; its
//! role is reloaded from the database on every request so a demotion or a
//! deletion takes effect immediately.

use axum::{
    extract::{FromRef, FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires a logged-in user of any role.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a logged-in admin.
pub struct RequireAdmin(pub CurrentUser);

/// Rejection returned by the auth extractors.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// Logged in without the required role.
    Forbidden,
    /// The account behind the session could not be loaded.
    Unavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Access denied").into_response(),
            Self::Unavailable => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

/// Path as the client sent it. Nested routers see the path with their
/// prefix stripped.
fn request_path(parts: &Parts) -> &str {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path(), |uri| uri.0.path())
}

fn not_logged_in(parts: &Parts) -> AuthRejection {
    if request_path(parts).starts_with("/api/") {
        AuthRejection::Unauthorized
    } else {
        AuthRejection::RedirectToLogin
    }
}

/// Load the session's user and refresh it from the account table.
///
/// A session whose account is gone is flushed and treated as logged out.
async fn current_user(
    parts: &Parts,
    state: &AppState,
) -> Result<Option<CurrentUser>, AuthRejection> {
    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };
    let Some(cached) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
    else {
        return Ok(None);
    };

    let stored = UserRepository::new(state.pool())
        .get_by_id(cached.id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %cached.id, "Failed to load session user");
            AuthRejection::Unavailable
        })?;

    let Some(user) = stored else {
        tracing::info!(user_id = %cached.id, "Session user no longer exists, ending session");
        if let Err(e) = session.flush().await {
            tracing::warn!(error = %e, "Failed to flush stale session");
        }
        return Ok(None);
    };

    let user = CurrentUser::from(user);
    if user.role != cached.role {
        tracing::info!(
            user_id = %user.id,
            from = %cached.role,
            to = %user.role,
            "Session role refreshed"
        );
        if let Err(e) = session.insert(session_keys::CURRENT_USER, &user).await {
            tracing::warn!(error = %e, "Failed to update session role");
        }
    }

    Ok(Some(user))
}

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let user = current_user(parts, &state)
            .await?
            .ok_or_else(|| not_logged_in(parts))?;

        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let user = current_user(parts, &state)
            .await?
            .ok_or_else(|| not_logged_in(parts))?;

        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, path = %request_path(parts), "Admin route denied");
            return Err(AuthRejection::Forbidden);
        }

        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(Self(current_user(parts, &state).await.ok().flatten()))
    }
}

/// Store the logged-in user in the session, cycling the session ID first.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Clear the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
