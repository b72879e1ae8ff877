//! Integration tests for login and user management.
//!
//! These tests require a running `PostgreSQL` database
//! (`LOYALTY_TEST_DATABASE_URL`).
//!
//! Run with: cargo test -p loyalty-card-integration-tests -- --ignored

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};

use loyalty_card_core::Role;
use loyalty_card_integration_tests::{
    TEST_PASSWORD, create_user, isolated_db, login, send, test_app, test_pool, unique_name,
};
use loyalty_card_server::{
    db::UserRepository,
    services::{AuthError, AuthService},
};

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_login_with_valid_credentials() {
    let pool = test_pool().await;
    let user = create_user(&pool, Role::Admin).await;

    let logged_in = AuthService::new(&pool)
        .login(user.username.as_str(), TEST_PASSWORD)
        .await
        .expect("login succeeds");
    assert_eq!(logged_in.id, user.id);
    assert_eq!(logged_in.role, Role::Admin);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_login_does_not_reveal_unknown_users() {
    let pool = test_pool().await;
    let user = create_user(&pool, Role::Staff).await;
    let auth = AuthService::new(&pool);

    let wrong_password = auth
        .login(user.username.as_str(), "not-the-password")
        .await
        .unwrap_err();
    let unknown_user = auth
        .login(&unique_name("ghost"), TEST_PASSWORD)
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert!(matches!(unknown_user, AuthError::InvalidCredentials));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_duplicate_username_rejected() {
    let pool = test_pool().await;
    let user = create_user(&pool, Role::Staff).await;

    let err = AuthService::new(&pool)
        .create_user(user.username.as_str(), TEST_PASSWORD, Role::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UserAlreadyExists));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_weak_password_rejected() {
    let pool = test_pool().await;
    let err = AuthService::new(&pool)
        .create_user(&unique_name("weak"), "short", Role::Staff)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::WeakPassword(_)));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_admin_cannot_delete_or_demote_self() {
    let pool = test_pool().await;
    let admin = create_user(&pool, Role::Admin).await;
    let auth = AuthService::new(&pool);

    let err = auth.delete_user(admin.id, admin.id).await.unwrap_err();
    assert!(matches!(err, AuthError::CannotDeleteSelf));

    let err = auth
        .update_user(admin.id, admin.id, None, Some(Role::Staff))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::CannotChangeOwnRole));

    // Password change on self is allowed
    auth.update_user(admin.id, admin.id, Some("a-new-password"), None)
        .await
        .expect("password change succeeds");
    auth.login(admin.username.as_str(), "a-new-password")
        .await
        .expect("new password works");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_admin_manages_other_users() {
    let pool = test_pool().await;
    let admin = create_user(&pool, Role::Admin).await;
    let staff = create_user(&pool, Role::Staff).await;
    let auth = AuthService::new(&pool);

    let promoted = auth
        .update_user(admin.id, staff.id, None, Some(Role::Admin))
        .await
        .expect("promotion succeeds");
    assert_eq!(promoted.role, Role::Admin);

    auth.delete_user(admin.id, staff.id)
        .await
        .expect("delete succeeds");
    let gone = UserRepository::new(&pool)
        .get_by_id(staff.id)
        .await
        .expect("query succeeds");
    assert!(gone.is_none());

    let err = auth.delete_user(admin.id, staff.id).await.unwrap_err();
    assert!(matches!(err, AuthError::UserNotFound));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_login_form_redirects_by_role() {
    let pool = test_pool().await;
    let admin = create_user(&pool, Role::Admin).await;
    let staff = create_user(&pool, Role::Staff).await;
    let app = test_app(pool);

    for (user, home) in [(&admin, "/admin"), (&staff, "/order")] {
        let cookie = login(&app, user.username.as_str()).await;
        let response = send(
            &app,
            Request::get("/").body(Body::empty()).expect("valid request"),
            Some(&cookie),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), home);
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_login_form_rejects_bad_password() {
    let pool = test_pool().await;
    let user = create_user(&pool, Role::Staff).await;
    let app = test_app(pool);

    let body = format!("username={}&password=wrong-password", user.username);
    let response = send(
        &app,
        Request::post("/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("valid request"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!response.headers().contains_key(header::SET_COOKIE));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_logout_ends_session() {
    let pool = test_pool().await;
    let user = create_user(&pool, Role::Staff).await;
    let app = test_app(pool);
    let cookie = login(&app, user.username.as_str()).await;

    let response = send(
        &app,
        Request::post("/auth/logout")
            .body(Body::empty())
            .expect("valid request"),
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = send(
        &app,
        Request::get("/api/customers?uid=0001")
            .body(Body::empty())
            .expect("valid request"),
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("valid request")
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_demoted_admin_loses_admin_on_next_request() {
    let pool = test_pool().await;
    let actor = create_user(&pool, Role::Admin).await;
    let target = create_user(&pool, Role::Admin).await;
    let app = test_app(pool.clone());
    let cookie = login(&app, target.username.as_str()).await;

    let response = send(&app, get("/admin"), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    AuthService::new(&pool)
        .update_user(actor.id, target.id, None, Some(Role::Staff))
        .await
        .expect("demotion succeeds");

    let response = send(&app, get("/admin"), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Still a valid staff session
    let response = send(&app, get("/order"), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_promoted_staff_gains_admin_on_next_request() {
    let pool = test_pool().await;
    let actor = create_user(&pool, Role::Admin).await;
    let staff = create_user(&pool, Role::Staff).await;
    let app = test_app(pool.clone());
    let cookie = login(&app, staff.username.as_str()).await;

    let response = send(&app, get("/admin"), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    AuthService::new(&pool)
        .update_user(actor.id, staff.id, None, Some(Role::Admin))
        .await
        .expect("promotion succeeds");

    let response = send(&app, get("/admin"), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_deleted_user_session_is_logged_out() {
    let pool = test_pool().await;
    let actor = create_user(&pool, Role::Admin).await;
    let target = create_user(&pool, Role::Admin).await;
    let app = test_app(pool.clone());
    let cookie = login(&app, target.username.as_str()).await;

    AuthService::new(&pool)
        .delete_user(actor.id, target.id)
        .await
        .expect("delete succeeds");

    let response = send(&app, get("/admin"), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/auth/login");

    let response = send(&app, get("/api/customers?uid=0001"), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

async fn admin_count(pool: &sqlx::PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM loyalty.user_account WHERE role = 'admin'")
        .fetch_one(pool)
        .await
        .expect("count admins")
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_concurrent_admin_removals_keep_one_admin() {
    let db = isolated_db().await;
    let pool = db.pool.clone();

    for round in 0..10 {
        sqlx::query("DELETE FROM loyalty.user_account")
            .execute(&pool)
            .await
            .expect("clear users");
        let a = create_user(&pool, Role::Admin).await;
        let b = create_user(&pool, Role::Admin).await;
        let demote = round % 2 == 0;

        // Each admin removes the other at the same time
        let handles: Vec<_> = [(a.id, b.id), (b.id, a.id)]
            .into_iter()
            .map(|(actor, target)| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    let auth = AuthService::new(&pool);
                    if demote {
                        auth.update_user(actor, target, None, Some(Role::Staff))
                            .await
                            .map(|_| ())
                    } else {
                        auth.delete_user(actor, target).await
                    }
                })
            })
            .collect();

        let mut applied = 0;
        let mut refused = 0;
        for handle in handles {
            match handle.await.expect("task panicked") {
                Ok(()) => applied += 1,
                Err(AuthError::LastAdmin) => refused += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!((applied, refused), (1, 1), "round {round}");
        assert_eq!(admin_count(&pool).await, 1, "round {round}");
    }

    db.drop_database().await;
}
