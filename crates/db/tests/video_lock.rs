//! Integration tests for the video lock queries.
//!
//! Exercises the conditional lock updates against a real database:
//! - Fresh, re-entrant and stale acquisition
//! - Concurrent acquisition by two users
//! - Holder-only release
//! - Next-candidate ordering

use chrono::{Duration, Utc};
use dashlabel_core::workflow::VideoStatus;
use dashlabel_db::models::user::CreateUser;
use dashlabel_db::models::video::{CreateVideo, Video};
use dashlabel_db::repositories::{UserRepo, VideoRepo};
use sqlx::PgPool;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn create_user(pool: &PgPool, name: &str) -> Uuid {
    UserRepo::create(
        pool,
        &CreateUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "not-a-real-hash".to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

async fn create_video(pool: &PgPool, owner: Uuid, filename: &str) -> Video {
    let id = Uuid::new_v4();
    VideoRepo::create(
        pool,
        &CreateVideo {
            id,
            filename: filename.to_string(),
            storage_key: format!("videos/{owner}/{id}/{filename}"),
            content_type: "video/mp4".to_string(),
            file_size_bytes: 1024,
            uploaded_by: owner,
        },
    )
    .await
    .unwrap()
}

fn ttl() -> Duration {
    Duration::hours(1)
}

// ---------------------------------------------------------------------------
// Acquire
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn new_video_starts_unannotated_and_unlocked(pool: PgPool) {
    let alice = create_user(&pool, "alice").await;
    let video = create_video(&pool, alice, "a.mp4").await;

    assert_eq!(video.status().unwrap(), VideoStatus::Unannotated);
    assert!(video.locked_by.is_none());
    assert!(video.lock_time.is_none());
    assert_eq!(video.timestamp_offset, 0.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn acquire_fresh_then_reentrant(pool: PgPool) {
    let alice = create_user(&pool, "alice").await;
    let video = create_video(&pool, alice, "a.mp4").await;
    let now = Utc::now();

    let locked = VideoRepo::try_acquire_lock(&pool, video.id, alice, now, now - ttl())
        .await
        .unwrap()
        .expect("fresh video should lock");
    assert_eq!(locked.status().unwrap(), VideoStatus::InProgress);
    assert_eq!(locked.locked_by, Some(alice));

    let later = now + Duration::minutes(5);
    let again = VideoRepo::try_acquire_lock(&pool, video.id, alice, later, later - ttl())
        .await
        .unwrap()
        .expect("holder may re-acquire");
    assert!(again.lock_time.unwrap() > locked.lock_time.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn live_foreign_lock_blocks_stale_lock_yields(pool: PgPool) {
    let alice = create_user(&pool, "alice").await;
    let bob = create_user(&pool, "bob").await;
    let video = create_video(&pool, alice, "a.mp4").await;
    let now = Utc::now();

    VideoRepo::try_acquire_lock(&pool, video.id, alice, now, now - ttl())
        .await
        .unwrap()
        .unwrap();

    let soon = now + Duration::minutes(30);
    let denied = VideoRepo::try_acquire_lock(&pool, video.id, bob, soon, soon - ttl())
        .await
        .unwrap();
    assert!(denied.is_none());

    let after_ttl = now + ttl();
    let reclaimed = VideoRepo::try_acquire_lock(&pool, video.id, bob, after_ttl, after_ttl - ttl())
        .await
        .unwrap()
        .expect("stale lock should be reclaimable");
    assert_eq!(reclaimed.locked_by, Some(bob));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_acquire_grants_exactly_one(pool: PgPool) {
    let alice = create_user(&pool, "alice").await;
    let bob = create_user(&pool, "bob").await;
    let video = create_video(&pool, alice, "a.mp4").await;
    let now = Utc::now();

    let (a, b) = tokio::join!(
        VideoRepo::try_acquire_lock(&pool, video.id, alice, now, now - ttl()),
        VideoRepo::try_acquire_lock(&pool, video.id, bob, now, now - ttl()),
    );
    let granted: Vec<_> = [a.unwrap(), b.unwrap()].into_iter().flatten().collect();
    assert_eq!(granted.len(), 1);

    let stored = VideoRepo::find_by_id(&pool, video.id).await.unwrap().unwrap();
    assert_eq!(stored.locked_by, granted[0].locked_by);
}

// ---------------------------------------------------------------------------
// Release
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn release_by_non_holder_changes_nothing(pool: PgPool) {
    let alice = create_user(&pool, "alice").await;
    let bob = create_user(&pool, "bob").await;
    let video = create_video(&pool, alice, "a.mp4").await;
    let now = Utc::now();

    let locked = VideoRepo::try_acquire_lock(&pool, video.id, alice, now, now - ttl())
        .await
        .unwrap()
        .unwrap();

    assert!(VideoRepo::release_lock(&pool, video.id, bob)
        .await
        .unwrap()
        .is_none());

    let stored = VideoRepo::find_by_id(&pool, video.id).await.unwrap().unwrap();
    assert_eq!(stored.locked_by, Some(alice));
    assert_eq!(stored.lock_time, locked.lock_time);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn release_by_holder_completes(pool: PgPool) {
    let alice = create_user(&pool, "alice").await;
    let video = create_video(&pool, alice, "a.mp4").await;
    let now = Utc::now();

    VideoRepo::try_acquire_lock(&pool, video.id, alice, now, now - ttl())
        .await
        .unwrap()
        .unwrap();
    let released = VideoRepo::release_lock(&pool, video.id, alice)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(released.status().unwrap(), VideoStatus::Completed);
    assert!(released.locked_by.is_none());
    assert!(released.lock_time.is_none());
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn next_candidate_oldest_first_skipping_live_locks(pool: PgPool) {
    let alice = create_user(&pool, "alice").await;
    let first = create_video(&pool, alice, "first.mp4").await;
    let second = create_video(&pool, alice, "second.mp4").await;

    sqlx::query("UPDATE videos SET upload_date = NOW() - INTERVAL '2 days' WHERE id = $1")
        .bind(first.id)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE videos SET upload_date = NOW() - INTERVAL '1 day' WHERE id = $1")
        .bind(second.id)
        .execute(&pool)
        .await
        .unwrap();

    let now = Utc::now();
    let next = VideoRepo::next_candidate(&pool, now - ttl()).await.unwrap().unwrap();
    assert_eq!(next.id, first.id);

    VideoRepo::try_acquire_lock(&pool, first.id, alice, now, now - ttl())
        .await
        .unwrap()
        .unwrap();
    let next = VideoRepo::next_candidate(&pool, now - ttl()).await.unwrap().unwrap();
    assert_eq!(next.id, second.id);

    // Two hours on, the lock on `first` is stale and it comes back first.
    let later = now + Duration::hours(2);
    let next = VideoRepo::next_candidate(&pool, later - ttl()).await.unwrap().unwrap();
    assert_eq!(next.id, first.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn next_candidate_none_when_all_completed(pool: PgPool) {
    let alice = create_user(&pool, "alice").await;
    let video = create_video(&pool, alice, "a.mp4").await;
    let now = Utc::now();

    VideoRepo::try_acquire_lock(&pool, video.id, alice, now, now - ttl())
        .await
        .unwrap()
        .unwrap();
    VideoRepo::release_lock(&pool, video.id, alice).await.unwrap().unwrap();

    assert!(VideoRepo::next_candidate(&pool, now - ttl())
        .await
        .unwrap()
        .is_none());
}
