//! Repository for the `annotations` table.

use dashlabel_core::annotation::{AnnotationInput, AnnotationMetadata};
use dashlabel_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::annotation::Annotation;
use crate::repositories::video_repo::VideoRepo;

const COLUMNS: &str = "id, video_id, user_id, timestamp, speed, button_state, \
                        error_detected, metadata, created_at";

/// Append-only annotation storage.
pub struct AnnotationRepo;

impl AnnotationRepo {
    /// Insert a batch of annotations on behalf of the current lock holder.
    ///
    /// The video row is locked `FOR UPDATE` for the duration of the insert, so
    /// the lock cannot change hands halfway. Returns `None` without writing
    /// anything if `user_id` does not hold the lock on an `in_progress` video.
    pub async fn insert_batch_as_holder(
        pool: &PgPool,
        video_id: DbId,
        user_id: DbId,
        inputs: &[AnnotationInput],
    ) -> Result<Option<Vec<Annotation>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if !VideoRepo::lock_row_for_holder(&mut tx, video_id, user_id).await? {
            return Ok(None);
        }

        let timestamps: Vec<f64> = inputs.iter().map(|a| a.timestamp).collect();
        let speeds: Vec<f64> = inputs.iter().map(|a| a.speed).collect();
        let button_states: Vec<bool> = inputs.iter().map(|a| a.button_state).collect();
        let errors: Vec<bool> = inputs.iter().map(|a| a.error_detected).collect();
        let metadata: Vec<Json<AnnotationMetadata>> =
            inputs.iter().map(|a| Json(a.metadata.clone())).collect();

        let query = format!(
            "INSERT INTO annotations \
                (video_id, user_id, timestamp, speed, button_state, error_detected, metadata) \
             SELECT $1, $2, * FROM UNNEST( \
                $3::float8[], $4::float8[], $5::bool[], $6::bool[], $7::jsonb[]) \
             RETURNING {COLUMNS}"
        );
        let mut rows = sqlx::query_as::<_, Annotation>(&query)
            .bind(video_id)
            .bind(user_id)
            .bind(&timestamps)
            .bind(&speeds)
            .bind(&button_states)
            .bind(&errors)
            .bind(&metadata)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        // RETURNING order is not guaranteed to follow input order.
        rows.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(Some(rows))
    }

    /// All annotations of a video in ascending timestamp order.
    pub async fn list_by_video(
        pool: &PgPool,
        video_id: DbId,
    ) -> Result<Vec<Annotation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotations
             WHERE video_id = $1
             ORDER BY timestamp ASC, created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(video_id)
            .fetch_all(pool)
            .await
    }
}
