//! Handlers for the `/annotations` resource.
//!
//! Lock and state rules live in [`crate::workflow::AnnotationWorkflow`]; these
//! handlers only translate HTTP.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use dashlabel_core::alignment::SeriesTarget;
use dashlabel_core::annotation::AnnotationInput;
use dashlabel_core::lock::LockState;
use dashlabel_core::types::DbId;
use dashlabel_db::models::annotation::Annotation;
use dashlabel_db::repositories::AnnotationRepo;
use serde::Deserialize;

use super::find_video;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /annotations/{id}/shift-timestamp`.
#[derive(Debug, Deserialize)]
pub struct ShiftTimestampRequest {
    pub target: SeriesTarget,
    /// Absolute offset in seconds; replaces the current one.
    pub offset: f64,
}

/// POST /api/v1/annotations/{id}/start
pub async fn start(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<LockState>>> {
    let lock = state.workflow.start_annotation(id, auth.user_id).await?;
    Ok(Json(DataResponse { data: lock }))
}

/// POST /api/v1/annotations/{id}/commit
pub async fn commit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(inputs): Json<Vec<AnnotationInput>>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<Annotation>>>)> {
    let created = state
        .workflow
        .commit_annotations(id, auth.user_id, &inputs)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// POST /api/v1/annotations/{id}/unlock
pub async fn unlock(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.workflow.unlock(id, auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/annotations/{id}/shift-timestamp
pub async fn shift_timestamp(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<ShiftTimestampRequest>,
) -> AppResult<StatusCode> {
    state
        .workflow
        .shift_timestamp(id, auth.user_id, input.target, input.offset)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/annotations/{id}
pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Annotation>>>> {
    find_video(&state, id).await?;
    let annotations = AnnotationRepo::list_by_video(&state.pool, id).await?;
    Ok(Json(DataResponse { data: annotations }))
}
