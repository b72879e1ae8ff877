//! JSON API used by the order page.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use loyalty_card_core::CustomerId;

use crate::error::{AppError, JsonError};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::models::CustomerSummary;
use crate::services::orders::{OrderOutcome, OrderRequest, OrderService};
use crate::state::AppState;

/// Query for customer lookup by card code.
#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub uid: Option<String>,
}

/// `POST /api/orders`
pub async fn submit_order(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<OrderRequest>,
) -> Result<Json<OrderOutcome>, JsonError> {
    let outcome = OrderService::new(state.pool())
        .submit(&request, &user.username)
        .await?;
    Ok(Json(outcome))
}

/// `GET /api/customers/{id}/summary`
pub async fn customer_summary(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CustomerId>,
) -> Result<Json<CustomerSummary>, JsonError> {
    let summary = OrderService::new(state.pool()).summary(id).await?;
    Ok(Json(summary))
}

/// `GET /api/customers?uid=CODE`
pub async fn lookup_customers(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<Vec<CustomerSummary>>, JsonError> {
    let uid = query
        .uid
        .ok_or_else(|| AppError::BadRequest("uid is required".to_string()))?;
    let customers = OrderService::new(state.pool()).lookup(&uid).await?;
    Ok(Json(customers))
}
