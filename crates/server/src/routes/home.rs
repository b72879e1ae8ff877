//! Landing redirect.

use axum::response::Redirect;

use crate::middleware::OptionalAuth;

/// Send logged-in users to their dashboard and everyone else to login.
pub async fn index(OptionalAuth(user): OptionalAuth) -> Redirect {
    match user {
        Some(user) => Redirect::to(user.home_path()),
        None => Redirect::to("/auth/login"),
    }
}
