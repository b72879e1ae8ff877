//! Order page and form submission.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;

use loyalty_card_core::CustomerId;

use crate::db::DrinkRepository;
use crate::error::AppError;
use crate::extract::PageForm;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Drink};
use crate::routes::MessageQuery;
use crate::services::orders::{OrderRequest, OrderService, QuantityInput};
use crate::state::AppState;

/// Order page template.
#[derive(Template, WebTemplate)]
#[template(path = "order/index.html")]
pub struct OrderTemplate {
    pub user: CurrentUser,
    pub drinks: Vec<Drink>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Order form data. `redeem` is present (as `on`) only when the box is ticked.
#[derive(Debug, Deserialize)]
pub struct OrderForm {
    pub customer_id: CustomerId,
    pub drink_name: String,
    pub quantity: String,
    pub redeem: Option<String>,
}

impl From<OrderForm> for OrderRequest {
    fn from(form: OrderForm) -> Self {
        Self {
            customer_id: form.customer_id,
            drink_name: form.drink_name,
            quantity: QuantityInput::Text(form.quantity),
            redeem: form.redeem.as_deref() == Some("on"),
        }
    }
}

/// Display the order page.
pub async fn order_page(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<OrderTemplate, AppError> {
    let drinks = DrinkRepository::new(state.pool()).list_all().await?;

    Ok(OrderTemplate {
        user,
        drinks,
        error: query.error,
        success: query.success,
    })
}

/// Handle the order form.
///
/// Success redirects back to the order page with a confirmation; failures
/// answer with the error status and message.
pub async fn submit(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    PageForm(form): PageForm<OrderForm>,
) -> Result<Redirect, AppError> {
    let request = OrderRequest::from(form);
    let outcome = OrderService::new(state.pool())
        .submit(&request, &user.username)
        .await?;

    Ok(Redirect::to(&format!(
        "/order?success={}",
        urlencoding::encode(&outcome.message())
    )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::services::orders::OrderError;

    use super::*;

    fn form(quantity: &str, redeem: Option<&str>) -> OrderForm {
        OrderForm {
            customer_id: CustomerId::new(3),
            drink_name: "Mocha".to_string(),
            quantity: quantity.to_string(),
            redeem: redeem.map(String::from),
        }
    }

    #[test]
    fn test_redeem_checkbox() {
        assert!(OrderRequest::from(form("1", Some("on"))).redeem);
        assert!(!OrderRequest::from(form("1", None)).redeem);
    }

    #[test]
    fn test_quantity_must_be_integer() {
        let request = OrderRequest::from(form(" 27 ", None));
        assert_eq!(request.quantity.parse().unwrap().get(), 27);

        for raw in ["two", "1.5", ""] {
            let request = OrderRequest::from(form(raw, None));
            assert!(matches!(
                request.quantity.parse(),
                Err(OrderError::InvalidQuantity(ref q)) if q == raw
            ));
        }
    }
}
