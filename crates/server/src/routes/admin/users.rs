//! User management actions.

use std::str::FromStr;

use axum::{extract::State, response::Redirect};
use serde::Deserialize;

use loyalty_card_core::{Role, UserId};

use super::{finish, non_blank, redirect_error};
use crate::error::AppError;
use crate::extract::PageForm;
use crate::middleware::RequireAdmin;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// New user form.
#[derive(Debug, Deserialize)]
pub struct CreateUserForm {
    pub username: String,
    pub password: String,
    pub role: String,
}

/// Password and/or role change. Blank fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateUserForm {
    pub user_id: UserId,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// User deletion form.
#[derive(Debug, Deserialize)]
pub struct DeleteUserForm {
    pub user_id: UserId,
}

/// `POST /admin/users`
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    PageForm(form): PageForm<CreateUserForm>,
) -> Result<Redirect, AppError> {
    let role = match Role::from_str(&form.role) {
        Ok(role) => role,
        Err(e) => return Ok(redirect_error(&e.to_string())),
    };

    tracing::info!(actor = %admin.id, username = %form.username.trim(), %role, "Creating user");
    let result = AuthService::new(state.pool())
        .create_user(&form.username, &form.password, role)
        .await;

    finish(result, |user| format!("User {} created", user.username))
}

/// `POST /admin/users/update`
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    PageForm(form): PageForm<UpdateUserForm>,
) -> Result<Redirect, AppError> {
    let role = match non_blank(form.role.as_deref()).map(Role::from_str).transpose() {
        Ok(role) => role,
        Err(e) => return Ok(redirect_error(&e.to_string())),
    };
    let password = form.password.as_deref().filter(|p| !p.is_empty());

    if role.is_none() && password.is_none() {
        return Ok(redirect_error("Nothing to update"));
    }

    let result = AuthService::new(state.pool())
        .update_user(admin.id, form.user_id, password, role)
        .await;

    finish(result, |user| format!("User {} updated", user.username))
}

/// `POST /admin/users/delete`
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    PageForm(form): PageForm<DeleteUserForm>,
) -> Result<Redirect, AppError> {
    let result = AuthService::new(state.pool())
        .delete_user(admin.id, form.user_id)
        .await;

    finish(result, |()| "User deleted".to_string())
}
