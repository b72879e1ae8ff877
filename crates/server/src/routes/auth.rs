//! Login and logout handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::extract::PageForm;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::routes::MessageQuery;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
    pub username: String,
}

/// Display the login page, or skip it when already logged in.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    if let Some(user) = user {
        return Redirect::to(user.home_path()).into_response();
    }

    LoginTemplate {
        error: query.error,
        success: query.success,
        username: String::new(),
    }
    .into_response()
}

/// Handle login form submission.
///
/// Wrong credentials re-render the form with a 401.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    PageForm(form): PageForm<LoginForm>,
) -> Result<Response, AppError> {
    let user = match AuthService::new(state.pool())
        .login(&form.username, &form.password)
        .await
    {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            tracing::warn!(username = %form.username.trim(), "Login failed");
            let page = LoginTemplate {
                error: Some("Invalid credentials".to_string()),
                success: None,
                username: form.username,
            };
            return Ok((StatusCode::UNAUTHORIZED, page).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let current = CurrentUser::from(user);

    set_current_user(&session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("failed to store session: {e}")))?;
    set_sentry_user(&current.id, current.username.as_str());

    Ok(Redirect::to(current.home_path()).into_response())
}

/// Log out and return to the login page.
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("failed to clear session: {e}")))?;
    clear_sentry_user();

    Ok(Redirect::to("/auth/login?success=Logged%20out"))
}
