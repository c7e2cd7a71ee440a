//! Persistence seam for the annotation workflow.

use async_trait::async_trait;
use chrono::Duration;
use dashlabel_core::alignment::SeriesTarget;
use dashlabel_core::annotation::AnnotationInput;
use dashlabel_core::types::{DbId, Timestamp};
use dashlabel_db::models::annotation::Annotation;
use dashlabel_db::models::video::Video;

use crate::error::AppResult;

/// What [`super::AnnotationWorkflow`] needs from storage.
///
/// Every mutating method is conditional and must be atomic per video:
/// `try_acquire` is a compare-and-set on the lock fields, and the
/// holder-guarded writes re-check ownership in the same unit of work they
/// write in. `None` means the condition did not hold.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    async fn find_video(&self, video_id: DbId) -> AppResult<Option<Video>>;

    /// Grant the lock to `user_id` unless another user holds one that is
    /// younger than `ttl` at `now`.
    async fn try_acquire(
        &self,
        video_id: DbId,
        user_id: DbId,
        now: Timestamp,
        ttl: Duration,
    ) -> AppResult<Option<Video>>;

    /// Clear the lock held by `user_id` and mark the video completed.
    async fn release(&self, video_id: DbId, user_id: DbId) -> AppResult<Option<Video>>;

    async fn insert_annotations(
        &self,
        video_id: DbId,
        user_id: DbId,
        inputs: &[AnnotationInput],
    ) -> AppResult<Option<Vec<Annotation>>>;

    /// Overwrite the offset of one series. Returns the number of rows touched.
    async fn set_offset(
        &self,
        video_id: DbId,
        user_id: DbId,
        target: SeriesTarget,
        offset: f64,
    ) -> AppResult<Option<u64>>;

    async fn next_candidate(&self, now: Timestamp, ttl: Duration) -> AppResult<Option<Video>>;
}
