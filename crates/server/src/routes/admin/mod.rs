//! Admin panel: dashboard and management actions.
//!
//! Every handler requires [`RequireAdmin`]. Mutating actions redirect back to
//! the dashboard with a `success` or `error` message; server failures surface
//! as [`AppError`] responses instead.

pub mod customers;
pub mod data;
pub mod drinks;
pub mod users;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{DefaultBodyLimit, Query, State},
    response::Redirect,
    routing::{get, post},
};

use crate::db::{CustomerRepository, DrinkRepository, UserRepository};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{CurrentUser, Customer, CustomerSummary, Drink, User};
use crate::routes::MessageQuery;
use crate::services::auth::MIN_PASSWORD_LENGTH;
use crate::state::AppState;

/// Largest accepted import upload.
const MAX_IMPORT_BYTES: usize = 10 * 1024 * 1024;

/// Admin dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct DashboardTemplate {
    pub user: CurrentUser,
    pub users: Vec<User>,
    pub customers: Vec<CustomerSummary>,
    pub drinks: Vec<Drink>,
    pub min_password_length: usize,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Create the admin routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/users", post(users::create))
        .route("/users/update", post(users::update))
        .route("/users/delete", post(users::delete))
        .route("/customers", post(customers::create))
        .route("/customers/delete", post(customers::delete))
        .route(
            "/customers/import",
            post(customers::import).layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES)),
        )
        .route("/drinks", post(drinks::create))
        .route("/drinks/delete", post(drinks::delete))
        .route("/export", get(data::export))
}

/// Display the admin dashboard.
pub async fn dashboard(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<DashboardTemplate, AppError> {
    let pool = state.pool();
    let users = UserRepository::new(pool).list_all().await?;
    let customers = CustomerRepository::new(pool)
        .list_all()
        .await?
        .iter()
        .map(Customer::summary)
        .collect();
    let drinks = DrinkRepository::new(pool).list_all().await?;

    Ok(DashboardTemplate {
        user,
        users,
        customers,
        drinks,
        min_password_length: MIN_PASSWORD_LENGTH,
        error: query.error,
        success: query.success,
    })
}

/// Redirect to the dashboard with a success message.
fn redirect_success(message: &str) -> Redirect {
    Redirect::to(&format!("/admin?success={}", urlencoding::encode(message)))
}

/// Redirect to the dashboard with an error message.
fn redirect_error(message: &str) -> Redirect {
    Redirect::to(&format!("/admin?error={}", urlencoding::encode(message)))
}

/// Turn an action result into a dashboard redirect. Client errors become an
/// `error` message; server errors propagate.
fn finish<T, E>(result: Result<T, E>, success: impl FnOnce(T) -> String) -> Result<Redirect, AppError>
where
    E: Into<AppError>,
{
    match result {
        Ok(value) => Ok(redirect_success(&success(value))),
        Err(e) => {
            let e = e.into();
            if e.status().is_server_error() {
                Err(e)
            } else {
                Ok(redirect_error(&e.public_message()))
            }
        }
    }
}

/// Trimmed form text, or `None` when blank.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{http::header::LOCATION, response::IntoResponse};

    use crate::db::RepositoryError;
    use crate::services::auth::AuthError;

    use super::*;

    fn location(redirect: Redirect) -> String {
        redirect
            .into_response()
            .headers()
            .get(LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_finish_success_redirect() {
        let result: Result<&str, AppError> = Ok("Ada");
        let redirect = finish(result, |name| format!("Customer {name} added")).unwrap();
        assert_eq!(location(redirect), "/admin?success=Customer%20Ada%20added");
    }

    #[test]
    fn test_finish_client_error_redirects() {
        let result: Result<(), AuthError> = Err(AuthError::CannotDeleteSelf);
        let redirect = finish(result, |()| String::new()).unwrap();
        assert_eq!(
            location(redirect),
            "/admin?error=You%20cannot%20delete%20your%20own%20account"
        );
    }

    #[test]
    fn test_finish_server_error_propagates() {
        let result: Result<(), RepositoryError> =
            Err(RepositoryError::DataCorruption("bad".to_string()));
        assert!(finish(result, |()| String::new()).is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(" staff ")), Some("staff"));
    }
}
