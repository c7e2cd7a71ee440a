//! Annotation workflow states and transition rules.
//!
//! A video moves `unannotated -> in_progress -> completed`. `completed` is not
//! terminal: re-locking a completed video puts it back into `in_progress` so it
//! can be re-annotated.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Status ID type matching SMALLINT in the `video_statuses` lookup table.
pub type StatusId = i16;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Coarse lifecycle stage of a video's annotation.
///
/// Discriminants match the seed rows of the `video_statuses` table.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    Unannotated = 1,
    InProgress = 2,
    Completed = 3,
}

impl VideoStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Resolve a database status ID.
    pub fn from_id(id: StatusId) -> Result<Self, CoreError> {
        match id {
            1 => Ok(Self::Unannotated),
            2 => Ok(Self::InProgress),
            3 => Ok(Self::Completed),
            other => Err(CoreError::Internal(format!(
                "Unknown video status id {other}"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unannotated => "unannotated",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl From<VideoStatus> for StatusId {
    fn from(value: VideoStatus) -> Self {
        value as StatusId
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Workflow events that move a video between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// A lock was granted to a user.
    Start,
    /// The lock holder released the video.
    Unlock,
}

/// Returns the set of statuses that `from` may transition to.
///
/// - `unannotated` -> `in_progress`
/// - `in_progress` -> `in_progress` (re-entrant start or stale-lock reclaim), `completed`
/// - `completed`   -> `in_progress` (re-annotation)
pub fn valid_transitions(from: VideoStatus) -> &'static [VideoStatus] {
    match from {
        VideoStatus::Unannotated => &[VideoStatus::InProgress],
        VideoStatus::InProgress => &[VideoStatus::InProgress, VideoStatus::Completed],
        VideoStatus::Completed => &[VideoStatus::InProgress],
    }
}

/// Validate that a status transition from `current` to `next` is allowed.
pub fn validate_transition(current: VideoStatus, next: VideoStatus) -> Result<(), CoreError> {
    let allowed = valid_transitions(current);
    if allowed.contains(&next) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Cannot transition video from '{}' to '{}'",
            current.as_str(),
            next.as_str()
        )))
    }
}

/// Compute the status a video ends up in after `event`.
pub fn next_status(current: VideoStatus, event: WorkflowEvent) -> Result<VideoStatus, CoreError> {
    let next = match event {
        WorkflowEvent::Start => VideoStatus::InProgress,
        WorkflowEvent::Unlock => VideoStatus::Completed,
    };
    validate_transition(current, next)?;
    Ok(next)
}

/// Annotations may only be appended while a video is `in_progress`.
pub fn ensure_annotatable(status: VideoStatus) -> Result<(), CoreError> {
    if status == VideoStatus::InProgress {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "Video is '{}'; start annotation before committing",
            status.as_str()
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
