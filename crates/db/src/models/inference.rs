//! Inference result model.

use dashlabel_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `inference_results` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InferenceResult {
    pub id: DbId,
    pub video_id: DbId,
    pub timestamp: f64,
    pub predicted_speed: f64,
    pub confidence: f64,
    pub created_at: Timestamp,
}
