pub mod annotation;
pub mod auth;
pub mod geolocation;
pub mod health;
pub mod inference;
pub mod video;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth
///     /register                        register
///     /login                           login
///     /refresh                         refresh
///     /logout                          logout (requires auth)
///
/// /videos                              upload (see `upload_routes`)
///     /next-unannotated                next eligible video
///     /{id}                            get
///     /{id}/speed-data                 import GPS/speed CSV (`csv_file`)
///     /{id}/button-data                import button log (`button_data_file`)
///     /{id}/data                       aligned speed + button series
///
/// /geolocation/{id}                    location track
///
/// /annotations/{id}                    list
///     /{id}/start                      acquire lock
///     /{id}/commit                     append annotations (holder only)
///     /{id}/unlock                     release lock (holder only)
///     /{id}/shift-timestamp            set series offset (holder only)
///
/// /inference/{id}/run                  queue inference (202)
/// /inference/{id}/results              stored predictions
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/videos", video::router())
        .nest("/geolocation", geolocation::router())
        .nest("/annotations", annotation::router())
        .nest("/inference", inference::router())
}

/// Build the `/api/v1` routes that receive whole video files.
///
/// ```text
/// POST /videos                         upload (multipart `video_file`)
/// ```
pub fn upload_routes() -> Router<AppState> {
    Router::new().nest("/videos", video::upload_router())
}
