//! Handlers for the `/inference` resource.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use dashlabel_core::types::DbId;
use dashlabel_db::models::inference::InferenceResult;
use dashlabel_db::repositories::InferenceResultRepo;
use serde::Serialize;

use super::find_video;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct InferenceAccepted {
    pub video_id: DbId,
    pub engine: String,
}

/// POST /api/v1/inference/{id}/run
///
/// Queue an inference run and return 202 without waiting for it.
pub async fn run(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<DataResponse<InferenceAccepted>>)> {
    let video = find_video(&state, id).await?;
    let engine = state.inference.name().to_string();

    state
        .inference_tasks
        .spawn(state.pool.clone(), Arc::clone(&state.inference), video);

    tracing::info!(video_id = %id, user_id = %auth.user_id, %engine, "Inference run queued");
    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: InferenceAccepted {
                video_id: id,
                engine,
            },
        }),
    ))
}

/// GET /api/v1/inference/{id}/results
pub async fn results(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<InferenceResult>>>> {
    find_video(&state, id).await?;
    let results = InferenceResultRepo::list_by_video(&state.pool, id).await?;
    Ok(Json(DataResponse { data: results }))
}
