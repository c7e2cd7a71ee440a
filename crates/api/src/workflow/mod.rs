//! Annotation workflow service.
//!
//! Composes the pure lock and state rules from `dashlabel_core` with an
//! [`AnnotationStore`]. The rules decide what the caller gets told; the store's
//! conditional writes decide what actually happens when requests race.

pub mod memory;
pub mod pg;
pub mod store;

use std::sync::Arc;

use chrono::Duration;
use dashlabel_core::alignment::{validate_offset, SeriesTarget};
use dashlabel_core::annotation::{validate_batch, AnnotationInput};
use dashlabel_core::clock::Clock;
use dashlabel_core::error::CoreError;
use dashlabel_core::lock::{
    evaluate_acquire, evaluate_release, require_ownership, AcquireOutcome, LockState,
    ALREADY_LOCKED_MSG, DEFAULT_LOCK_TTL_SECS,
};
use dashlabel_core::types::DbId;
use dashlabel_core::workflow::{ensure_annotatable, next_status, WorkflowEvent};
use dashlabel_db::models::annotation::Annotation;
use dashlabel_db::models::video::Video;

pub use store::AnnotationStore;

use crate::error::{AppError, AppResult};

/// Tunables for the workflow.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowConfig {
    /// Age at which an unreleased lock may be taken over.
    pub lock_ttl: Duration,
}

impl WorkflowConfig {
    pub fn from_ttl_secs(secs: i64) -> Self {
        Self {
            lock_ttl: Duration::seconds(secs),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self::from_ttl_secs(DEFAULT_LOCK_TTL_SECS)
    }
}

pub struct AnnotationWorkflow {
    store: Arc<dyn AnnotationStore>,
    clock: Arc<dyn Clock>,
    config: WorkflowConfig,
}

impl AnnotationWorkflow {
    pub fn new(store: Arc<dyn AnnotationStore>, clock: Arc<dyn Clock>, config: WorkflowConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> WorkflowConfig {
        self.config
    }

    async fn load(&self, video_id: DbId) -> AppResult<Video> {
        self.store.find_video(video_id).await?.ok_or(AppError::Core(CoreError::NotFound {
            entity: "Video",
            id: video_id,
        }))
    }

    /// Take the annotation lock and move the video to `in_progress`.
    ///
    /// Succeeds when the video is unlocked, already held by `user_id`, or held
    /// under an expired lock. Fails with `Conflict` on a live foreign lock,
    /// including one that another request won a moment earlier.
    pub async fn start_annotation(&self, video_id: DbId, user_id: DbId) -> AppResult<LockState> {
        let video = self.load(video_id).await?;
        let now = self.clock.now();
        let ttl = self.config.lock_ttl;

        let outcome = match evaluate_acquire(video.lock_snapshot(), user_id, now, ttl) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::info!(%video_id, %user_id, holder = ?video.locked_by, "Lock denied");
                return Err(e.into());
            }
        };
        next_status(video.status()?, WorkflowEvent::Start)?;

        let locked = self
            .store
            .try_acquire(video_id, user_id, now, ttl)
            .await?
            .ok_or_else(|| {
                tracing::info!(%video_id, %user_id, "Lock lost to a concurrent request");
                AppError::Core(CoreError::Conflict(ALREADY_LOCKED_MSG.into()))
            })?;

        match outcome {
            AcquireOutcome::Fresh => {
                tracing::info!(%video_id, %user_id, "Annotation lock acquired");
            }
            AcquireOutcome::Reentrant => {
                tracing::debug!(%video_id, %user_id, "Annotation lock refreshed");
            }
            AcquireOutcome::Reclaimed { previous_holder } => {
                tracing::warn!(%video_id, %user_id, %previous_holder, "Expired annotation lock reclaimed");
            }
        }

        Ok(locked.lock_state()?)
    }

    /// Append a batch of annotations. The whole batch is validated first and
    /// stored atomically, and only while `user_id` holds the lock.
    pub async fn commit_annotations(
        &self,
        video_id: DbId,
        user_id: DbId,
        inputs: &[AnnotationInput],
    ) -> AppResult<Vec<Annotation>> {
        validate_batch(inputs)?;

        let video = self.load(video_id).await?;
        ensure_annotatable(video.status()?)?;
        require_ownership(video.locked_by, user_id)?;

        let created = self
            .store
            .insert_annotations(video_id, user_id, inputs)
            .await?
            .ok_or_else(|| lost_lock(video_id))?;

        tracing::info!(%video_id, %user_id, count = created.len(), "Annotations committed");
        Ok(created)
    }

    /// Release the lock and mark the video `completed`.
    pub async fn unlock(&self, video_id: DbId, user_id: DbId) -> AppResult<Video> {
        let video = self.load(video_id).await?;
        evaluate_release(video.locked_by, user_id)?;
        next_status(video.status()?, WorkflowEvent::Unlock)?;

        let released = self
            .store
            .release(video_id, user_id)
            .await?
            .ok_or_else(|| lost_lock(video_id))?;

        tracing::info!(%video_id, %user_id, "Annotation lock released, video completed");
        Ok(released)
    }

    /// Overwrite the timestamp offset of one series.
    pub async fn shift_timestamp(
        &self,
        video_id: DbId,
        user_id: DbId,
        target: SeriesTarget,
        offset: f64,
    ) -> AppResult<u64> {
        validate_offset(offset)?;

        let video = self.load(video_id).await?;
        require_ownership(video.locked_by, user_id)?;

        let updated = self
            .store
            .set_offset(video_id, user_id, target, offset)
            .await?
            .ok_or_else(|| lost_lock(video_id))?;

        tracing::info!(
            %video_id,
            %user_id,
            target = target.as_str(),
            offset,
            updated,
            "Timestamp offset applied"
        );
        Ok(updated)
    }

    /// Oldest video open for annotation, if any.
    pub async fn next_unannotated(&self) -> AppResult<Option<Video>> {
        self.store
            .next_candidate(self.clock.now(), self.config.lock_ttl)
            .await
    }
}

/// The pre-check saw the caller as holder, but the guarded write did not.
fn lost_lock(video_id: DbId) -> AppError {
    tracing::info!(%video_id, "Lock changed hands before the write");
    AppError::Core(CoreError::Forbidden(
        "You do not hold the annotation lock for this video".into(),
    ))
}
