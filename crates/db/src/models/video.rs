//! Video entity model and DTOs.

use dashlabel_core::error::CoreError;
use dashlabel_core::lock::{LockSnapshot, LockState};
use dashlabel_core::selection::QueueEntry;
use dashlabel_core::types::{DbId, Timestamp};
use dashlabel_core::workflow::{StatusId, VideoStatus};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `videos` table.
#[derive(Debug, Clone, FromRow)]
pub struct Video {
    pub id: DbId,
    pub filename: String,
    pub storage_key: String,
    pub content_type: String,
    pub file_size_bytes: i64,
    pub uploaded_by: DbId,
    pub upload_date: Timestamp,
    pub status_id: StatusId,
    pub locked_by: Option<DbId>,
    pub lock_time: Option<Timestamp>,
    pub timestamp_offset: f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Video {
    pub fn status(&self) -> Result<VideoStatus, CoreError> {
        VideoStatus::from_id(self.status_id)
    }

    pub fn lock_snapshot(&self) -> LockSnapshot {
        LockSnapshot {
            locked_by: self.locked_by,
            lock_time: self.lock_time,
        }
    }

    pub fn lock_state(&self) -> Result<LockState, CoreError> {
        Ok(LockState {
            video_id: self.id,
            status: self.status()?,
            locked_by: self.locked_by,
            lock_time: self.lock_time,
        })
    }

    /// Convert into the API shape, resolving the status id to its name.
    pub fn into_response(self) -> Result<VideoResponse, CoreError> {
        let status = self.status()?;
        Ok(VideoResponse {
            id: self.id,
            filename: self.filename,
            storage_key: self.storage_key,
            content_type: self.content_type,
            file_size_bytes: self.file_size_bytes,
            uploaded_by: self.uploaded_by,
            upload_date: self.upload_date,
            status,
            locked_by: self.locked_by,
            lock_time: self.lock_time,
            timestamp_offset: self.timestamp_offset,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Rows reference `video_statuses`, so an unknown id cannot come out of the
/// database. Should one appear anyway it is treated as never eligible.
impl QueueEntry for Video {
    fn id(&self) -> DbId {
        self.id
    }

    fn status(&self) -> VideoStatus {
        VideoStatus::from_id(self.status_id).unwrap_or(VideoStatus::Completed)
    }

    fn lock_time(&self) -> Option<Timestamp> {
        self.lock_time
    }

    fn upload_date(&self) -> Timestamp {
        self.upload_date
    }
}

/// Video as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct VideoResponse {
    pub id: DbId,
    pub filename: String,
    pub storage_key: String,
    pub content_type: String,
    pub file_size_bytes: i64,
    pub uploaded_by: DbId,
    pub upload_date: Timestamp,
    pub status: VideoStatus,
    pub locked_by: Option<DbId>,
    pub lock_time: Option<Timestamp>,
    pub timestamp_offset: f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a freshly uploaded video.
///
/// The id is generated by the caller because the storage key embeds it.
#[derive(Debug, Clone)]
pub struct CreateVideo {
    pub id: DbId,
    pub filename: String,
    pub storage_key: String,
    pub content_type: String,
    pub file_size_bytes: i64,
    pub uploaded_by: DbId,
}
