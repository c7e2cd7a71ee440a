use std::sync::Arc;

use crate::background::inference::InferenceTasks;
use crate::config::ServerConfig;
use crate::inference::InferenceEngine;
use crate::storage::BlobStore;
use crate::workflow::AnnotationWorkflow;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: dashlabel_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Lock and annotation workflow service.
    pub workflow: Arc<AnnotationWorkflow>,
    /// Blob storage for uploaded video files.
    pub blob_store: Arc<dyn BlobStore>,
    /// Producer of speed predictions.
    pub inference: Arc<dyn InferenceEngine>,
    /// Tracker for detached inference runs.
    pub inference_tasks: InferenceTasks,
}
