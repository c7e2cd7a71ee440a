//! HTTP-level tests for the annotation workflow and inference endpoints.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, get_auth, post_auth, post_json_auth, register_and_login, upload_video};
use dashlabel_db::repositories::{AnnotationRepo, VideoRepo};
use sqlx::PgPool;

fn start_uri(id: uuid::Uuid) -> String {
    format!("/api/v1/annotations/{id}/start")
}

fn commit_uri(id: uuid::Uuid) -> String {
    format!("/api/v1/annotations/{id}/commit")
}

fn unlock_uri(id: uuid::Uuid) -> String {
    format!("/api/v1/annotations/{id}/unlock")
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn end_to_end_annotation_and_reannotation(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let alice = register_and_login(&app, "alice").await;
    let bob = register_and_login(&app, "bob").await;
    let video_id = upload_video(&app, &alice, "clip.mp4").await;

    let response = post_auth(app.clone(), &start_uri(video_id), &alice.token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let lock = body_json(response).await;
    assert_eq!(lock["data"]["status"], "in_progress");
    assert_eq!(lock["data"]["locked_by"], alice.id.to_string());
    assert!(lock["data"]["lock_time"].is_string());

    let response = post_json_auth(
        app.clone(),
        &commit_uri(video_id),
        serde_json::json!([
            { "timestamp": 10.0, "speed": 25.5, "button_state": false },
        ]),
        &alice.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let committed = body_json(response).await;
    assert_eq!(committed["data"][0]["speed"], 25.5);
    assert_eq!(committed["data"][0]["error_detected"], false);
    assert_eq!(committed["data"][0]["user_id"], alice.id.to_string());

    let response = post_auth(app.clone(), &unlock_uri(video_id), &alice.token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let video = VideoRepo::find_by_id(&pool, video_id).await.unwrap().unwrap();
    assert_eq!(video.status_id, 3);
    assert!(video.locked_by.is_none());
    assert!(video.lock_time.is_none());

    let response = post_auth(app.clone(), &start_uri(video_id), &bob.token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let lock = body_json(response).await;
    assert_eq!(lock["data"]["status"], "in_progress");
    assert_eq!(lock["data"]["locked_by"], bob.id.to_string());

    let response = get_auth(
        app,
        &format!("/api/v1/annotations/{video_id}"),
        &bob.token,
    )
    .await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn foreign_lock_conflicts_and_forbids(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let alice = register_and_login(&app, "alice").await;
    let bob = register_and_login(&app, "bob").await;
    let video_id = upload_video(&app, &alice, "clip.mp4").await;

    post_auth(app.clone(), &start_uri(video_id), &alice.token).await;

    let response = post_auth(app.clone(), &start_uri(video_id), &bob.token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");

    let response = post_json_auth(
        app.clone(),
        &commit_uri(video_id),
        serde_json::json!([{ "timestamp": 1.0, "speed": 10.0, "button_state": true }]),
        &bob.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_auth(app.clone(), &unlock_uri(video_id), &bob.token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        app,
        &format!("/api/v1/annotations/{video_id}/shift-timestamp"),
        serde_json::json!({ "target": "video", "offset": 2.0 }),
        &bob.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let video = VideoRepo::find_by_id(&pool, video_id).await.unwrap().unwrap();
    assert_eq!(video.locked_by, Some(alice.id));
    assert_eq!(video.timestamp_offset, 0.0);
    assert!(AnnotationRepo::list_by_video(&pool, video_id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn commit_before_start_is_forbidden(pool: PgPool) {
    let app = common::build_test_app(pool);
    let alice = register_and_login(&app, "alice").await;
    let video_id = upload_video(&app, &alice, "clip.mp4").await;

    let response = post_json_auth(
        app,
        &commit_uri(video_id),
        serde_json::json!([{ "timestamp": 1.0, "speed": 10.0, "button_state": true }]),
        &alice.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_entry_rejects_whole_batch(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let alice = register_and_login(&app, "alice").await;
    let video_id = upload_video(&app, &alice, "clip.mp4").await;
    post_auth(app.clone(), &start_uri(video_id), &alice.token).await;

    let response = post_json_auth(
        app,
        &commit_uri(video_id),
        serde_json::json!([
            { "timestamp": 1.0, "speed": 10.0, "button_state": true },
            { "timestamp": 2.0, "speed": -3.0, "button_state": false },
        ]),
        &alice.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let message = body_json(response).await["error"].as_str().unwrap().to_string();
    assert!(message.contains("annotations[1]"), "unexpected message: {message}");

    assert!(AnnotationRepo::list_by_video(&pool, video_id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn metadata_round_trips(pool: PgPool) {
    let app = common::build_test_app(pool);
    let alice = register_and_login(&app, "alice").await;
    let video_id = upload_video(&app, &alice, "clip.mp4").await;
    post_auth(app.clone(), &start_uri(video_id), &alice.token).await;

    let response = post_json_auth(
        app,
        &commit_uri(video_id),
        serde_json::json!([{
            "timestamp": 4.0,
            "speed": 12.0,
            "button_state": true,
            "error_detected": true,
            "metadata": {
                "label": "hard brake",
                "tags": ["night", "rain"],
                "extra": { "lane": 2 }
            }
        }]),
        &alice.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let metadata = &json["data"][0]["metadata"];
    assert_eq!(metadata["label"], "hard brake");
    assert_eq!(metadata["tags"][1], "rain");
    assert_eq!(metadata["extra"]["lane"], 2);
    assert_eq!(json["data"][0]["error_detected"], true);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn shift_timestamp_is_absolute(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let alice = register_and_login(&app, "alice").await;
    let video_id = upload_video(&app, &alice, "clip.mp4").await;
    post_auth(app.clone(), &start_uri(video_id), &alice.token).await;
    let uri = format!("/api/v1/annotations/{video_id}/shift-timestamp");

    for _ in 0..2 {
        let response = post_json_auth(
            app.clone(),
            &uri,
            serde_json::json!({ "target": "video", "offset": 3.25 }),
            &alice.token,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let video = VideoRepo::find_by_id(&pool, video_id).await.unwrap().unwrap();
    assert_eq!(video.timestamp_offset, 3.25);

    let response = post_json_auth(
        app,
        &uri,
        serde_json::json!({ "target": "gps", "offset": 1.0 }),
        &alice.token,
    )
    .await;
    assert!(response.status().is_client_error());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn start_on_missing_video_is_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let alice = register_and_login(&app, "alice").await;

    let response = post_auth(app, &start_uri(uuid::Uuid::new_v4()), &alice.token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Inference
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn inference_run_is_accepted_and_stored(pool: PgPool) {
    let app = common::build_test_app(pool);
    let alice = register_and_login(&app, "alice").await;
    let video_id = upload_video(&app, &alice, "clip.mp4").await;

    let response = post_auth(
        app.clone(),
        &format!("/api/v1/inference/{video_id}/run"),
        &alice.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await["data"]["engine"], "placeholder");

    let results_uri = format!("/api/v1/inference/{video_id}/results");
    let mut results = serde_json::Value::Null;
    for _ in 0..50 {
        let response = get_auth(app.clone(), &results_uri, &alice.token).await;
        assert_eq!(response.status(), StatusCode::OK);
        results = body_json(response).await;
        if !results["data"].as_array().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let data = results["data"].as_array().unwrap();
    assert_eq!(data.len(), 200);
    assert_eq!(data[0]["timestamp"], 0.0);
    for p in data {
        let confidence = p["confidence"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&confidence));
    }
}
