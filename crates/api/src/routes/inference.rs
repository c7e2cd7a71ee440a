//! Route definitions for the `/inference` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::inference;
use crate::state::AppState;

/// Routes mounted at `/inference`.
///
/// ```text
/// POST /{id}/run      -> run
/// GET  /{id}/results  -> results
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/run", post(inference::run))
        .route("/{id}/results", get(inference::results))
}
