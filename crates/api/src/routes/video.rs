//! Route definitions for the `/videos` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::video;
use crate::state::AppState;

/// Routes mounted at `/videos`, apart from the upload.
///
/// ```text
/// GET  /next-unannotated   -> next_unannotated
/// GET  /{id}               -> get_video
/// POST /{id}/speed-data    -> upload_speed_data
/// POST /{id}/button-data   -> upload_button_data
/// GET  /{id}/data          -> get_video_data
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/next-unannotated", get(video::next_unannotated))
        .route("/{id}", get(video::get_video))
        .route("/{id}/speed-data", post(video::upload_speed_data))
        .route("/{id}/button-data", post(video::upload_button_data))
        .route("/{id}/data", get(video::get_video_data))
}

/// The upload route, `POST /videos`. It runs under its own timeout, so it is
/// kept out of [`router`].
pub fn upload_router() -> Router<AppState> {
    Router::new().route("/", post(video::upload_video))
}
