use axum::routing::get;
use axum::Router;

use crate::handlers::video;
use crate::state::AppState;

/// Routes mounted at `/geolocation`.
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(video::get_geolocation))
}
