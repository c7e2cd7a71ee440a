//! Speed inference engines.
//!
//! The model that predicts speed from video frames runs outside this service.
//! [`PlaceholderEngine`] stands in for it and emits a plausible random track,
//! so the rest of the pipeline (storage, listing, client overlays) works end to
//! end.

use async_trait::async_trait;
use dashlabel_core::error::CoreError;
use dashlabel_core::inference::{placeholder_predictions, Prediction};
use dashlabel_db::models::video::Video;

/// Produces speed predictions for a video.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Engine name recorded in logs.
    fn name(&self) -> &str;

    async fn predict(&self, video: &Video) -> Result<Vec<Prediction>, CoreError>;
}

/// Random predictions around a typical urban speed.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderEngine;

#[async_trait]
impl InferenceEngine for PlaceholderEngine {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn predict(&self, video: &Video) -> Result<Vec<Prediction>, CoreError> {
        let predictions = {
            let mut rng = rand::rng();
            placeholder_predictions(&mut rng)
        };
        tracing::debug!(
            video_id = %video.id,
            count = predictions.len(),
            "Generated placeholder predictions"
        );
        Ok(predictions)
    }
}
