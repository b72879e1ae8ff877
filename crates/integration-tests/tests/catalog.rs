//! Integration tests for the drink catalog and customer admin actions.
//!
//! These tests require a running `PostgreSQL` database
//! (`LOYALTY_TEST_DATABASE_URL`).

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};

use loyalty_card_core::Role;
use loyalty_card_integration_tests::{create_user, login, send, test_app, test_pool, unique_name};
use loyalty_card_server::db::{CustomerRepository, DrinkRepository};

fn form(uri: &str, body: String) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("valid request")
}

fn location(response: &axum::http::Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_drink_added_shows_on_order_page_then_deleted() {
    let pool = test_pool().await;
    let admin = create_user(&pool, Role::Admin).await;
    let app = test_app(pool.clone());
    let cookie = login(&app, admin.username.as_str()).await;
    let drink = unique_name("Cortado");

    let response = send(
        &app,
        form("/admin/drinks", format!("drink_name={drink}")),
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/admin?success="));

    let response = send(
        &app,
        Request::get("/order").body(Body::empty()).expect("valid request"),
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    assert!(String::from_utf8_lossy(&page).contains(&drink));

    let stored = DrinkRepository::new(&pool)
        .list_all()
        .await
        .expect("list drinks")
        .into_iter()
        .find(|d| d.name == drink)
        .expect("drink stored");

    let response = send(
        &app,
        form("/admin/drinks/delete", format!("drink_id={}", stored.id)),
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let remaining = DrinkRepository::new(&pool).list_all().await.expect("list drinks");
    assert!(remaining.iter().all(|d| d.id != stored.id));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_blank_drink_name_rejected() {
    let pool = test_pool().await;
    let admin = create_user(&pool, Role::Admin).await;
    let app = test_app(pool);
    let cookie = login(&app, admin.username.as_str()).await;

    let response = send(
        &app,
        form("/admin/drinks", "drink_name=%20%20".to_string()),
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/admin?error="));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_admin_adds_and_deletes_customer() {
    let pool = test_pool().await;
    let admin = create_user(&pool, Role::Admin).await;
    let app = test_app(pool.clone());
    let cookie = login(&app, admin.username.as_str()).await;
    let code = unique_name("cust");

    let response = send(
        &app,
        form("/admin/customers", format!("name=Dana&unique_id={code}")),
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/admin?success="));

    let customers = CustomerRepository::new(&pool);
    let code_value = loyalty_card_core::UniqueCode::parse(&code).expect("valid code");
    let created = customers.find_by_code(&code_value).await.expect("lookup");
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].ledger.balance(), 0);

    let response = send(
        &app,
        form(
            "/admin/customers/delete",
            format!("customer_id={}", created[0].id),
        ),
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(customers.find_by_code(&code_value).await.expect("lookup").is_empty());
}
