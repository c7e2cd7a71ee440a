//! Request handlers, one submodule per resource.
//!
//! Handlers extract and check request input, call into the workflow service
//! or the repositories in `dashlabel_db`, and map failures via [`AppError`].
//!
//! [`AppError`]: crate::error::AppError

pub mod annotation;
pub mod auth;
pub mod inference;
pub mod video;

use dashlabel_core::error::CoreError;
use dashlabel_core::types::DbId;
use dashlabel_db::models::video::Video;
use dashlabel_db::repositories::VideoRepo;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Load a video or fail with 404.
pub(crate) async fn find_video(state: &AppState, id: DbId) -> AppResult<Video> {
    VideoRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Video", id }))
}
