//! In-process [`AnnotationStore`] used by workflow tests and local tooling.
//!
//! All state sits behind one mutex, so each trait method is atomic in the
//! same way the conditional SQL statements are.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashlabel_core::alignment::{apply_offset, SeriesTarget};
use dashlabel_core::annotation::AnnotationInput;
use dashlabel_core::lock::{check_ownership, evaluate_acquire};
use dashlabel_core::selection::select_next;
use dashlabel_core::timeseries::{cmp_timestamps, ButtonSampleInput, SpeedSampleInput};
use dashlabel_core::types::{DbId, Timestamp};
use dashlabel_core::workflow::VideoStatus;
use dashlabel_db::models::annotation::Annotation;
use dashlabel_db::models::sample::{ButtonSample, SpeedSample};
use dashlabel_db::models::video::Video;
use sqlx::types::Json;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::store::AnnotationStore;
use crate::error::AppResult;

#[derive(Debug, Default)]
struct Tables {
    videos: HashMap<DbId, Video>,
    speed: HashMap<DbId, Vec<SpeedSample>>,
    button: HashMap<DbId, Vec<ButtonSample>>,
    annotations: HashMap<DbId, Vec<Annotation>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unannotated, unlocked video uploaded by `uploaded_by` at
    /// `upload_date`.
    pub async fn insert_video(&self, uploaded_by: DbId, upload_date: Timestamp) -> Video {
        let id = Uuid::new_v4();
        let video = Video {
            id,
            filename: format!("{id}.mp4"),
            storage_key: format!("videos/{uploaded_by}/{id}/{id}.mp4"),
            content_type: "video/mp4".into(),
            file_size_bytes: 0,
            uploaded_by,
            upload_date,
            status_id: VideoStatus::Unannotated.id(),
            locked_by: None,
            lock_time: None,
            timestamp_offset: 0.0,
            created_at: upload_date,
            updated_at: upload_date,
        };
        self.tables.lock().await.videos.insert(id, video.clone());
        video
    }

    pub async fn insert_speed_samples(&self, video_id: DbId, inputs: &[SpeedSampleInput]) {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        let series = tables.speed.entry(video_id).or_default();
        let offset = series.first().map_or(0.0, |s| s.timestamp_offset);
        series.extend(inputs.iter().map(|s| SpeedSample {
            id: Uuid::new_v4(),
            video_id,
            timestamp: s.timestamp,
            speed: s.speed,
            latitude: s.latitude,
            longitude: s.longitude,
            altitude: s.altitude,
            accuracy: s.accuracy,
            timestamp_offset: offset,
            created_at: now,
        }));
    }

    pub async fn insert_button_samples(&self, video_id: DbId, inputs: &[ButtonSampleInput]) {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        let series = tables.button.entry(video_id).or_default();
        let offset = series.first().map_or(0.0, |s| s.timestamp_offset);
        series.extend(inputs.iter().map(|s| ButtonSample {
            id: Uuid::new_v4(),
            video_id,
            timestamp: s.timestamp,
            state: s.state,
            timestamp_offset: offset,
            created_at: now,
        }));
    }

    pub async fn speed_samples(&self, video_id: DbId) -> Vec<SpeedSample> {
        let tables = self.tables.lock().await;
        tables.speed.get(&video_id).cloned().unwrap_or_default()
    }

    pub async fn button_samples(&self, video_id: DbId) -> Vec<ButtonSample> {
        let tables = self.tables.lock().await;
        tables.button.get(&video_id).cloned().unwrap_or_default()
    }

    pub async fn annotations(&self, video_id: DbId) -> Vec<Annotation> {
        let tables = self.tables.lock().await;
        tables.annotations.get(&video_id).cloned().unwrap_or_default()
    }
}

fn holds_lock(video: &Video, user_id: DbId) -> bool {
    video.status_id == VideoStatus::InProgress.id() && check_ownership(video.locked_by, user_id)
}

#[async_trait]
impl AnnotationStore for MemoryStore {
    async fn find_video(&self, video_id: DbId) -> AppResult<Option<Video>> {
        Ok(self.tables.lock().await.videos.get(&video_id).cloned())
    }

    async fn try_acquire(
        &self,
        video_id: DbId,
        user_id: DbId,
        now: Timestamp,
        ttl: Duration,
    ) -> AppResult<Option<Video>> {
        let mut tables = self.tables.lock().await;
        let Some(video) = tables.videos.get_mut(&video_id) else {
            return Ok(None);
        };
        if evaluate_acquire(video.lock_snapshot(), user_id, now, ttl).is_err() {
            return Ok(None);
        }
        video.status_id = VideoStatus::InProgress.id();
        video.locked_by = Some(user_id);
        video.lock_time = Some(now);
        video.updated_at = now;
        Ok(Some(video.clone()))
    }

    async fn release(&self, video_id: DbId, user_id: DbId) -> AppResult<Option<Video>> {
        let mut tables = self.tables.lock().await;
        let Some(video) = tables.videos.get_mut(&video_id) else {
            return Ok(None);
        };
        if !check_ownership(video.locked_by, user_id) {
            return Ok(None);
        }
        video.status_id = VideoStatus::Completed.id();
        video.locked_by = None;
        video.lock_time = None;
        Ok(Some(video.clone()))
    }

    async fn insert_annotations(
        &self,
        video_id: DbId,
        user_id: DbId,
        inputs: &[AnnotationInput],
    ) -> AppResult<Option<Vec<Annotation>>> {
        let mut tables = self.tables.lock().await;
        match tables.videos.get(&video_id) {
            Some(video) if holds_lock(video, user_id) => {}
            _ => return Ok(None),
        }

        let now = Utc::now();
        let mut created: Vec<Annotation> = inputs
            .iter()
            .map(|input| Annotation {
                id: Uuid::new_v4(),
                video_id,
                user_id,
                timestamp: input.timestamp,
                speed: input.speed,
                button_state: input.button_state,
                error_detected: input.error_detected,
                metadata: Json(input.metadata.clone()),
                created_at: now,
            })
            .collect();
        created.sort_by(|a, b| cmp_timestamps(a.timestamp, b.timestamp));

        tables
            .annotations
            .entry(video_id)
            .or_default()
            .extend(created.iter().cloned());
        Ok(Some(created))
    }

    async fn set_offset(
        &self,
        video_id: DbId,
        user_id: DbId,
        target: SeriesTarget,
        offset: f64,
    ) -> AppResult<Option<u64>> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;
        let Some(video) = tables.videos.get_mut(&video_id) else {
            return Ok(None);
        };
        if !holds_lock(video, user_id) {
            return Ok(None);
        }

        let updated = match target {
            SeriesTarget::Video => {
                video.timestamp_offset = offset;
                1
            }
            SeriesTarget::Speed => match tables.speed.get_mut(&video_id) {
                Some(series) => apply_offset(series, offset)?,
                None => 0,
            },
            SeriesTarget::Button => match tables.button.get_mut(&video_id) {
                Some(series) => apply_offset(series, offset)?,
                None => 0,
            },
        };
        Ok(Some(updated as u64))
    }

    async fn next_candidate(&self, now: Timestamp, ttl: Duration) -> AppResult<Option<Video>> {
        let tables = self.tables.lock().await;
        Ok(select_next(tables.videos.values(), now, ttl).cloned())
    }
}
