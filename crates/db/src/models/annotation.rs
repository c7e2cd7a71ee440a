//! Annotation entity model.

use dashlabel_core::annotation::AnnotationMetadata;
use dashlabel_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `annotations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Annotation {
    pub id: DbId,
    pub video_id: DbId,
    pub user_id: DbId,
    pub timestamp: f64,
    pub speed: f64,
    pub button_state: bool,
    pub error_detected: bool,
    pub metadata: Json<AnnotationMetadata>,
    pub created_at: Timestamp,
}
