//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Redirect by role, or to login
//! GET  /health                        - Liveness
//! GET  /health/ready                  - Database readiness
//!
//! # Auth
//! GET  /auth/login                    - Login page
//! POST /auth/login                    - Login action
//! POST /auth/logout                   - Logout action
//!
//! # Orders (any logged-in user)
//! GET  /order                         - Order page
//! POST /order                         - Submit order form
//! POST /api/orders                    - Submit order (JSON)
//! GET  /api/customers?uid=CODE        - Customers by card code
//! GET  /api/customers/{id}/summary    - Customer counters
//!
//! # Admin (admin role)
//! GET  /admin                         - Dashboard
//! POST /admin/users                   - Create user
//! POST /admin/users/update            - Change password/role
//! POST /admin/users/delete            - Delete user
//! POST /admin/customers               - Create customer
//! POST /admin/customers/delete        - Delete customer
//! POST /admin/customers/import        - Import workbook (multipart `excel_file`)
//! POST /admin/drinks                  - Add drink
//! POST /admin/drinks/delete           - Delete drink
//! GET  /admin/export                  - Download workbook
//! ```

pub mod admin;
pub mod api;
pub mod auth;
pub mod health;
pub mod home;
pub mod orders;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::DefaultOnResponse, trace::OnResponse, trace::TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::Span;

use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(api::submit_order))
        .route("/customers", get(api::lookup_customers))
        .route("/customers/{id}/summary", get(api::customer_summary))
}

/// Create all page and API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .route("/order", get(orders::order_page).post(orders::submit))
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
        .nest("/admin", admin::routes())
}

/// Build the full application with its middleware stack.
///
/// The session layer is passed in so tests can swap the `PostgreSQL` store
/// for an in-memory one.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(routes())
        .nest_service("/static", ServeDir::new("crates/server/static"))
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(session_layer)
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
