#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use futures::StreamExt;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use dashlabel_api::auth::jwt::JwtConfig;
use dashlabel_api::background::inference::InferenceTasks;
use dashlabel_api::config::ServerConfig;
use dashlabel_api::inference::PlaceholderEngine;
use dashlabel_api::router::build_app_router;
use dashlabel_api::state::AppState;
use dashlabel_api::storage::local::LocalBlobStore;
use dashlabel_api::storage::StorageConfig;
use dashlabel_api::workflow::pg::PgStore;
use dashlabel_api::workflow::{AnnotationWorkflow, WorkflowConfig};
use dashlabel_core::clock::SystemClock;
use dashlabel_core::lock::DEFAULT_LOCK_TTL_SECS;

const BOUNDARY: &str = "dashlabel-test-boundary";

/// Build a test `ServerConfig` with safe defaults. Blobs and upload spool
/// files go to fresh directories under the system temp dir.
pub fn test_config() -> ServerConfig {
    let spool_dir = std::env::temp_dir().join(format!("dashlabel-spool-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&spool_dir).unwrap();

    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        upload_timeout_secs: 60,
        jwt: JwtConfig {
            secret: "test-secret-for-integration-tests".to_string(),
            access_token_expiry_mins: 30,
            refresh_token_expiry_days: 7,
        },
        lock_ttl_secs: DEFAULT_LOCK_TTL_SECS,
        max_upload_bytes: 10 * 1024 * 1024,
        upload_spool_dir: spool_dir,
        inference_shutdown_grace_secs: 1,
        storage: StorageConfig::Local {
            root: std::env::temp_dir().join(format!("dashlabel-test-{}", Uuid::new_v4())),
        },
    }
}

/// Build the full application router, wired the way `main.rs` wires it.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config())
}

/// Like [`build_test_app`], with a caller-tuned config.
pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> Router {
    let root = match &config.storage {
        StorageConfig::Local { root } => root.clone(),
        StorageConfig::S3 { .. } => unreachable!("tests use local storage"),
    };

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        workflow: Arc::new(AnnotationWorkflow::new(
            Arc::new(PgStore::new(pool)),
            Arc::new(SystemClock),
            WorkflowConfig::from_ttl_secs(config.lock_ttl_secs),
        )),
        blob_store: Arc::new(LocalBlobStore::new(root)),
        inference: Arc::new(PlaceholderEngine),
        inference_tasks: InferenceTasks::new(),
    };

    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::post(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// A single-file multipart body, framed with [`multipart_content_type`].
pub fn multipart_body(field: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// POST a single-file multipart body.
pub async fn post_multipart(
    app: Router,
    uri: &str,
    token: &str,
    field: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> Response<Body> {
    let request = Request::post(uri)
        .header("content-type", multipart_content_type())
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(multipart_body(field, filename, content_type, bytes)))
        .unwrap();
    send(app, request).await
}

/// A body that arrives in `pieces` chunks, each after `delay`.
pub fn trickle(bytes: Vec<u8>, pieces: usize, delay: Duration) -> Body {
    let size = bytes.len().div_ceil(pieces).max(1);
    let chunks: Vec<Bytes> = bytes.chunks(size).map(Bytes::copy_from_slice).collect();
    let stream = futures::stream::iter(chunks).then(move |chunk| async move {
        tokio::time::sleep(delay).await;
        Ok::<_, std::io::Error>(chunk)
    });
    Body::from_stream(stream)
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub const TEST_PASSWORD: &str = "dashcam-password";

/// A registered, logged-in user.
pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

/// Register `username` through the API and log in.
pub async fn register_and_login(app: &Router, username: &str) -> TestUser {
    let email = format!("{username}@example.com");
    let response = post_json(
        app.clone(),
        "/api/v1/auth/register",
        serde_json::json!({ "username": username, "email": email, "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id: Uuid = serde_json::from_value(body_json(response).await["data"]["id"].clone()).unwrap();

    let response = post_json(
        app.clone(),
        "/api/v1/auth/login",
        serde_json::json!({ "email": email, "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    TestUser { id, token }
}

/// Upload a small video as `user` and return its id.
pub async fn upload_video(app: &Router, user: &TestUser, filename: &str) -> Uuid {
    let response = post_multipart(
        app.clone(),
        "/api/v1/videos",
        &user.token,
        "video_file",
        filename,
        "video/mp4",
        b"\x00\x00\x00\x18ftypmp42 fake video bytes",
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    serde_json::from_value(body_json(response).await["data"]["id"].clone()).unwrap()
}
