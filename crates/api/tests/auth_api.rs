//! HTTP-level tests for registration, login, token refresh and logout.

mod common;

use axum::http::StatusCode;
use common::{body_json, get_auth, post_auth, post_json, register_and_login, TEST_PASSWORD};
use dashlabel_db::repositories::UserRepo;
use sqlx::PgPool;

async fn login(app: &axum::Router, email: &str, password: &str) -> axum::response::Response {
    post_json(
        app.clone(),
        "/api/v1/auth/login",
        serde_json::json!({ "email": email, "password": password }),
    )
    .await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_then_login(pool: PgPool) {
    let app = common::build_test_app(pool);
    let user = register_and_login(&app, "alice").await;

    let response = login(&app, "alice@example.com", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["token_type"], "bearer");
    assert_eq!(json["expires_in"], 30 * 60);
    assert!(json["refresh_token"].is_string());
    assert_eq!(json["user"]["id"], user.id.to_string());
    assert_eq!(json["user"]["username"], "alice");
    assert!(json["user"].get("password_hash").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_email_is_conflict(pool: PgPool) {
    let app = common::build_test_app(pool);
    register_and_login(&app, "bob").await;

    let response = post_json(
        app,
        "/api/v1/auth/register",
        serde_json::json!({
            "username": "bobby",
            "email": "bob@example.com",
            "password": TEST_PASSWORD,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_rejects_bad_input(pool: PgPool) {
    let app = common::build_test_app(pool);

    let short_password = post_json(
        app.clone(),
        "/api/v1/auth/register",
        serde_json::json!({ "username": "carol", "email": "carol@example.com", "password": "short" }),
    )
    .await;
    assert_eq!(short_password.status(), StatusCode::BAD_REQUEST);

    let bad_email = post_json(
        app,
        "/api/v1/auth/register",
        serde_json::json!({ "username": "carol", "email": "not-an-email", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(bad_email.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(bad_email).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn wrong_password_and_unknown_email_are_401(pool: PgPool) {
    let app = common::build_test_app(pool);
    register_and_login(&app, "dave").await;

    let response = login(&app, "dave@example.com", "wrong-password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = login(&app, "nobody@example.com", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deactivated_account_is_403(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let user = register_and_login(&app, "erin").await;
    UserRepo::deactivate(&pool, user.id).await.unwrap();

    let response = login(&app, "erin@example.com", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_token_rotates(pool: PgPool) {
    let app = common::build_test_app(pool);
    register_and_login(&app, "frank").await;

    let json = body_json(login(&app, "frank@example.com", TEST_PASSWORD).await).await;
    let refresh_token = json["refresh_token"].as_str().unwrap().to_string();

    let first = post_json(
        app.clone(),
        "/api/v1/auth/refresh",
        serde_json::json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);
    let rotated = body_json(first).await;
    assert_ne!(rotated["refresh_token"], refresh_token.as_str());

    let reused = post_json(
        app,
        "/api/v1/auth/refresh",
        serde_json::json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(reused.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn logout_revokes_refresh_tokens(pool: PgPool) {
    let app = common::build_test_app(pool);
    register_and_login(&app, "grace").await;

    let json = body_json(login(&app, "grace@example.com", TEST_PASSWORD).await).await;
    let access_token = json["access_token"].as_str().unwrap();
    let refresh_token = json["refresh_token"].as_str().unwrap();

    let response = post_auth(app.clone(), "/api/v1/auth/logout", access_token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post_json(
        app,
        "/api/v1/auth/refresh",
        serde_json::json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn garbage_token_is_401(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/videos/next-unannotated", "not.a.jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
