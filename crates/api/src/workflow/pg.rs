//! PostgreSQL-backed [`AnnotationStore`].

use async_trait::async_trait;
use chrono::Duration;
use dashlabel_core::alignment::SeriesTarget;
use dashlabel_core::annotation::AnnotationInput;
use dashlabel_core::lock::stale_cutoff;
use dashlabel_core::types::{DbId, Timestamp};
use dashlabel_db::models::annotation::Annotation;
use dashlabel_db::models::video::Video;
use dashlabel_db::repositories::{AnnotationRepo, VideoRepo};
use dashlabel_db::DbPool;

use super::store::AnnotationStore;
use crate::error::AppResult;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnnotationStore for PgStore {
    async fn find_video(&self, video_id: DbId) -> AppResult<Option<Video>> {
        Ok(VideoRepo::find_by_id(&self.pool, video_id).await?)
    }

    async fn try_acquire(
        &self,
        video_id: DbId,
        user_id: DbId,
        now: Timestamp,
        ttl: Duration,
    ) -> AppResult<Option<Video>> {
        let stale_before = stale_cutoff(now, ttl);
        Ok(VideoRepo::try_acquire_lock(&self.pool, video_id, user_id, now, stale_before).await?)
    }

    async fn release(&self, video_id: DbId, user_id: DbId) -> AppResult<Option<Video>> {
        Ok(VideoRepo::release_lock(&self.pool, video_id, user_id).await?)
    }

    async fn insert_annotations(
        &self,
        video_id: DbId,
        user_id: DbId,
        inputs: &[AnnotationInput],
    ) -> AppResult<Option<Vec<Annotation>>> {
        Ok(AnnotationRepo::insert_batch_as_holder(&self.pool, video_id, user_id, inputs).await?)
    }

    async fn set_offset(
        &self,
        video_id: DbId,
        user_id: DbId,
        target: SeriesTarget,
        offset: f64,
    ) -> AppResult<Option<u64>> {
        Ok(VideoRepo::set_offset_as_holder(&self.pool, video_id, user_id, target, offset).await?)
    }

    async fn next_candidate(&self, now: Timestamp, ttl: Duration) -> AppResult<Option<Video>> {
        Ok(VideoRepo::next_candidate(&self.pool, stale_cutoff(now, ttl)).await?)
    }
}
