//! Detached inference runs.
//!
//! `POST /inference/{id}/run` answers 202 immediately and hands the work to
//! [`InferenceTasks`]. On shutdown the tracker is closed and in-flight runs get
//! a bounded grace period before they are cancelled.

use std::sync::Arc;
use std::time::Duration;

use dashlabel_core::error::CoreError;
use dashlabel_core::inference::validate_prediction;
use dashlabel_db::models::video::Video;
use dashlabel_db::repositories::InferenceResultRepo;
use dashlabel_db::DbPool;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::{AppError, AppResult};
use crate::inference::InferenceEngine;

/// Spawner and tracker for background inference tasks.
#[derive(Debug, Clone, Default)]
pub struct InferenceTasks {
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl InferenceTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of runs still in flight.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Run `engine` against `video` in the background.
    pub fn spawn(&self, pool: DbPool, engine: Arc<dyn InferenceEngine>, video: Video) {
        let cancel = self.cancel.clone();
        self.tracker.spawn(async move {
            let video_id = video.id;
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::warn!(%video_id, "Inference run cancelled by shutdown");
                }
                result = run_inference(&pool, engine.as_ref(), &video) => match result {
                    Ok(stored) => {
                        tracing::info!(%video_id, engine = engine.name(), stored, "Inference run finished");
                    }
                    Err(e) => {
                        tracing::error!(%video_id, engine = engine.name(), error = %e, "Inference run failed");
                    }
                },
            }
        });
    }

    /// Stop accepting runs and wait up to `grace` for in-flight ones, then
    /// cancel whatever is left.
    pub async fn shutdown(&self, grace: Duration) {
        self.tracker.close();
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            tracing::warn!(
                remaining = self.tracker.len(),
                "Inference runs still active after grace period, cancelling"
            );
            self.cancel.cancel();
            self.tracker.wait().await;
        }
    }
}

/// Predict, validate every point, and store the batch.
///
/// An invalid prediction rejects the whole batch so a video never ends up with
/// a partial result set from one run.
pub async fn run_inference(
    pool: &DbPool,
    engine: &dyn InferenceEngine,
    video: &Video,
) -> AppResult<u64> {
    let predictions = engine.predict(video).await?;

    for (i, p) in predictions.iter().enumerate() {
        validate_prediction(p).map_err(|e| {
            AppError::Core(CoreError::Internal(format!(
                "engine '{}' produced an invalid prediction at index {i}: {e}",
                engine.name()
            )))
        })?;
    }

    let stored = InferenceResultRepo::insert_batch(pool, video.id, &predictions).await?;
    Ok(stored)
}
