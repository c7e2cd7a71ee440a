//! Repository for the `inference_results` table.

use dashlabel_core::inference::Prediction;
use dashlabel_core::types::DbId;
use sqlx::PgPool;

use crate::models::inference::InferenceResult;

const COLUMNS: &str = "id, video_id, timestamp, predicted_speed, confidence, created_at";

/// Stored model predictions. Written only by the inference task.
pub struct InferenceResultRepo;

impl InferenceResultRepo {
    pub async fn insert_batch(
        pool: &PgPool,
        video_id: DbId,
        predictions: &[Prediction],
    ) -> Result<u64, sqlx::Error> {
        let timestamps: Vec<f64> = predictions.iter().map(|p| p.timestamp).collect();
        let speeds: Vec<f64> = predictions.iter().map(|p| p.predicted_speed).collect();
        let confidences: Vec<f64> = predictions.iter().map(|p| p.confidence).collect();

        let result = sqlx::query(
            "INSERT INTO inference_results (video_id, timestamp, predicted_speed, confidence) \
             SELECT $1, * FROM UNNEST($2::float8[], $3::float8[], $4::float8[])",
        )
        .bind(video_id)
        .bind(&timestamps)
        .bind(&speeds)
        .bind(&confidences)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn list_by_video(
        pool: &PgPool,
        video_id: DbId,
    ) -> Result<Vec<InferenceResult>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM inference_results
             WHERE video_id = $1
             ORDER BY timestamp ASC, id ASC"
        );
        sqlx::query_as::<_, InferenceResult>(&query)
            .bind(video_id)
            .fetch_all(pool)
            .await
    }
}
