//! Route definitions for the `/annotations` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::annotation;
use crate::state::AppState;

/// Routes mounted at `/annotations`.
///
/// ```text
/// GET  /{id}                  -> list
/// POST /{id}/start            -> start
/// POST /{id}/commit           -> commit
/// POST /{id}/unlock           -> unlock
/// POST /{id}/shift-timestamp  -> shift_timestamp
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(annotation::list))
        .route("/{id}/start", post(annotation::start))
        .route("/{id}/commit", post(annotation::commit))
        .route("/{id}/unlock", post(annotation::unlock))
        .route("/{id}/shift-timestamp", post(annotation::shift_timestamp))
}
