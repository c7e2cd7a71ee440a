//! Repository for the `videos` table.
//!
//! Lock acquisition and release are single conditional `UPDATE`s. Postgres
//! serializes concurrent updates of one row and re-checks the `WHERE` clause
//! against the winner's write, so two requesters can never both be granted a
//! live lock.

use dashlabel_core::alignment::SeriesTarget;
use dashlabel_core::types::{DbId, Timestamp};
use dashlabel_core::workflow::VideoStatus;
use sqlx::{PgConnection, PgPool};

use crate::models::video::{CreateVideo, Video};
use crate::repositories::sample_repo::{ButtonSampleRepo, SpeedSampleRepo};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, filename, storage_key, content_type, file_size_bytes, \
                        uploaded_by, upload_date, status_id, locked_by, lock_time, \
                        timestamp_offset, created_at, updated_at";

/// Provides CRUD and locking operations for videos.
pub struct VideoRepo;

impl VideoRepo {
    /// Insert a freshly uploaded video. It starts `unannotated`, unlocked,
    /// with a zero offset.
    pub async fn create(pool: &PgPool, input: &CreateVideo) -> Result<Video, sqlx::Error> {
        let query = format!(
            "INSERT INTO videos (id, filename, storage_key, content_type, file_size_bytes, \
                                 uploaded_by, status_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(input.id)
            .bind(&input.filename)
            .bind(&input.storage_key)
            .bind(&input.content_type)
            .bind(input.file_size_bytes)
            .bind(input.uploaded_by)
            .bind(VideoStatus::Unannotated.id())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Video>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM videos WHERE id = $1");
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Grant the annotation lock to `user_id` if the video is unlocked, already
    /// held by `user_id`, or held under a lock taken at or before
    /// `stale_before`.
    ///
    /// On success the video moves to `in_progress` with `lock_time = now` and
    /// the updated row is returned. `None` means the row is missing or another
    /// user holds a live lock.
    pub async fn try_acquire_lock(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<Option<Video>, sqlx::Error> {
        let query = format!(
            "UPDATE videos
             SET status_id = $4, locked_by = $2, lock_time = $3
             WHERE id = $1
               AND (locked_by IS NULL
                    OR locked_by = $2
                    OR lock_time IS NULL
                    OR lock_time <= $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .bind(user_id)
            .bind(now)
            .bind(VideoStatus::InProgress.id())
            .bind(stale_before)
            .fetch_optional(pool)
            .await
    }

    /// Release the lock held by `user_id` and mark the video `completed`.
    ///
    /// Returns `None` if the row is missing or `user_id` is not the holder.
    pub async fn release_lock(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Video>, sqlx::Error> {
        let query = format!(
            "UPDATE videos
             SET status_id = $3, locked_by = NULL, lock_time = NULL
             WHERE id = $1 AND locked_by = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .bind(user_id)
            .bind(VideoStatus::Completed.id())
            .fetch_optional(pool)
            .await
    }

    /// Oldest video eligible for annotation: `unannotated`, or `in_progress`
    /// with a lock taken strictly before `stale_before`.
    pub async fn next_candidate(
        pool: &PgPool,
        stale_before: Timestamp,
    ) -> Result<Option<Video>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM videos
             WHERE status_id = $1
                OR (status_id = $2 AND (lock_time IS NULL OR lock_time < $3))
             ORDER BY upload_date ASC, id ASC
             LIMIT 1"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(VideoStatus::Unannotated.id())
            .bind(VideoStatus::InProgress.id())
            .bind(stale_before)
            .fetch_optional(pool)
            .await
    }

    /// Row-lock the video for the rest of the transaction if `user_id` holds
    /// its annotation lock. Returns `false` otherwise.
    pub async fn lock_row_for_holder(
        conn: &mut PgConnection,
        id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(DbId,)> = sqlx::query_as(
            "SELECT id FROM videos
             WHERE id = $1 AND locked_by = $2 AND status_id = $3
             FOR UPDATE",
        )
        .bind(id)
        .bind(user_id)
        .bind(VideoStatus::InProgress.id())
        .fetch_optional(conn)
        .await?;
        Ok(row.is_some())
    }

    /// Overwrite the offset of one series, but only while `user_id` holds the
    /// lock. Raw timestamps are untouched.
    ///
    /// Returns the number of rows updated, or `None` if `user_id` is not the
    /// holder.
    pub async fn set_offset_as_holder(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
        target: SeriesTarget,
        offset: f64,
    ) -> Result<Option<u64>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if !Self::lock_row_for_holder(&mut tx, id, user_id).await? {
            return Ok(None);
        }

        let updated = match target {
            SeriesTarget::Video => {
                sqlx::query("UPDATE videos SET timestamp_offset = $2 WHERE id = $1")
                    .bind(id)
                    .bind(offset)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected()
            }
            SeriesTarget::Speed => SpeedSampleRepo::set_offset(&mut tx, id, offset).await?,
            SeriesTarget::Button => ButtonSampleRepo::set_offset(&mut tx, id, offset).await?,
        };

        tx.commit().await?;
        Ok(Some(updated))
    }
}
