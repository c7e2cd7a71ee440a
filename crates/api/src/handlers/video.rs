//! Handlers for the `/videos` and `/geolocation` resources: video upload,
//! sensor stream import and aligned data retrieval.

use std::path::Path as FsPath;

use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use dashlabel_core::alignment::{Aligned, SeriesTarget};
use dashlabel_core::error::CoreError;
use dashlabel_core::lock::check_ownership;
use dashlabel_core::storage::{validate_video_content_type, video_storage_key};
use dashlabel_core::timeseries::{parse_button_log, parse_speed_csv};
use dashlabel_core::types::DbId;
use dashlabel_db::models::sample::{AlignedSample, ButtonSample, SpeedSample};
use dashlabel_db::models::video::{CreateVideo, Video, VideoResponse};
use dashlabel_db::repositories::{ButtonSampleRepo, SpeedSampleRepo, VideoRepo};
use serde::Serialize;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::find_video;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::storage::StorageError;

/// Multipart field names.
const VIDEO_FIELD: &str = "video_file";
const SPEED_FIELD: &str = "csv_file";
const BUTTON_FIELD: &str = "button_data_file";

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Result of a sensor stream import.
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub video_id: DbId,
    pub series: SeriesTarget,
    pub imported: u64,
}

/// Both sensor series of a video, aligned to its timeline.
#[derive(Debug, Serialize)]
pub struct VideoData {
    pub video_id: DbId,
    pub timestamp_offset: f64,
    pub speed: Vec<AlignedSample<SpeedSample>>,
    pub button: Vec<AlignedSample<ButtonSample>>,
}

/// One point of a location track.
#[derive(Debug, Serialize)]
pub struct LocationPoint {
    pub timestamp: f64,
    pub effective_timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub accuracy: f64,
    pub speed: f64,
}

impl From<SpeedSample> for LocationPoint {
    fn from(s: SpeedSample) -> Self {
        Self {
            effective_timestamp: s.effective_timestamp(),
            timestamp: s.timestamp,
            latitude: s.latitude,
            longitude: s.longitude,
            altitude: s.altitude,
            accuracy: s.accuracy,
            speed: s.speed,
        }
    }
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

/// A small text file pulled out of a multipart body in one piece.
struct UploadedFile {
    filename: String,
    bytes: Bytes,
}

/// Read the field called `name`, skipping any others.
async fn read_file_field(multipart: &mut Multipart, name: &str) -> AppResult<UploadedFile> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(name) {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest(format!("Field '{name}' is empty")));
        }
        return Ok(UploadedFile { filename, bytes });
    }

    Err(AppError::BadRequest(format!(
        "Missing multipart field '{name}'"
    )))
}

/// A video streamed to disk. The spool file is removed when this drops.
struct SpooledVideo {
    filename: String,
    content_type: String,
    path: TempPath,
    size: u64,
}

/// Stream the `video_file` field chunk by chunk into a file under
/// `spool_dir`, skipping any other fields.
///
/// The content type is checked before anything is written.
async fn spool_video_field(
    multipart: &mut Multipart,
    spool_dir: &FsPath,
) -> AppResult<SpooledVideo> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        validate_video_content_type(field.content_type())?;
        let content_type = field.content_type().unwrap_or_default().to_string();

        let (file, path) = tempfile::Builder::new()
            .prefix("dashlabel-upload-")
            .tempfile_in(spool_dir)
            .map_err(StorageError::from)?
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let mut size = 0u64;
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len() as u64;
            file.write_all(&chunk).await.map_err(StorageError::from)?;
        }
        file.flush().await.map_err(StorageError::from)?;

        if size == 0 {
            return Err(AppError::BadRequest(format!(
                "Field '{VIDEO_FIELD}' is empty"
            )));
        }
        return Ok(SpooledVideo {
            filename,
            content_type,
            path,
            size,
        });
    }

    Err(AppError::BadRequest(format!(
        "Missing multipart field '{VIDEO_FIELD}'"
    )))
}

fn utf8(file: &UploadedFile) -> AppResult<&str> {
    std::str::from_utf8(&file.bytes)
        .map_err(|_| AppError::BadRequest(format!("'{}' is not valid UTF-8 text", file.filename)))
}

/// Sensor data may be attached by the uploader or by whoever is annotating.
fn ensure_can_attach(video: &Video, user_id: DbId) -> AppResult<()> {
    if video.uploaded_by == user_id || check_ownership(video.locked_by, user_id) {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "Permission denied".into(),
        )))
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/videos
///
/// Store an uploaded video and register it as `unannotated`.
pub async fn upload_video(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<VideoResponse>>)> {
    let video = spool_video_field(&mut multipart, &state.config.upload_spool_dir).await?;

    let video_id = Uuid::new_v4();
    let storage_key = video_storage_key(auth.user_id, video_id, &video.filename);
    let size = video.size;

    state
        .blob_store
        .put_file(&storage_key, &video.path, &video.content_type)
        .await?;
    drop(video.path);

    let input = CreateVideo {
        id: video_id,
        filename: video.filename,
        storage_key,
        content_type: video.content_type,
        file_size_bytes: size as i64,
        uploaded_by: auth.user_id,
    };
    let video = match VideoRepo::create(&state.pool, &input).await {
        Ok(video) => video,
        Err(e) => {
            if let Err(cleanup) = state.blob_store.delete(&input.storage_key).await {
                tracing::warn!(key = %input.storage_key, error = %cleanup, "Failed to remove orphaned blob");
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        %video_id,
        user_id = %auth.user_id,
        size,
        backend = state.blob_store.backend(),
        "Video uploaded"
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: video.into_response()?,
        }),
    ))
}

/// GET /api/v1/videos/{id}
pub async fn get_video(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<VideoResponse>>> {
    let video = find_video(&state, id).await?;
    Ok(Json(DataResponse {
        data: video.into_response()?,
    }))
}

/// GET /api/v1/videos/next-unannotated
///
/// `{"data": null}` when nothing is waiting.
pub async fn next_unannotated(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<DataResponse<Option<VideoResponse>>>> {
    let next = state
        .workflow
        .next_unannotated()
        .await?
        .map(Video::into_response)
        .transpose()?;
    Ok(Json(DataResponse { data: next }))
}

/// POST /api/v1/videos/{id}/speed-data
///
/// Import a GPS/speed CSV. A bad row rejects the whole file.
pub async fn upload_speed_data(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<ImportSummary>>)> {
    let video = find_video(&state, id).await?;
    ensure_can_attach(&video, auth.user_id)?;

    let file = read_file_field(&mut multipart, SPEED_FIELD).await?;
    let samples = parse_speed_csv(utf8(&file)?)?;
    let imported = SpeedSampleRepo::insert_batch(&state.pool, id, &samples).await?;

    tracing::info!(video_id = %id, user_id = %auth.user_id, imported, "Speed samples imported");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: ImportSummary {
                video_id: id,
                series: SeriesTarget::Speed,
                imported,
            },
        }),
    ))
}

/// POST /api/v1/videos/{id}/button-data
pub async fn upload_button_data(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<ImportSummary>>)> {
    let video = find_video(&state, id).await?;
    ensure_can_attach(&video, auth.user_id)?;

    let file = read_file_field(&mut multipart, BUTTON_FIELD).await?;
    let samples = parse_button_log(utf8(&file)?)?;
    let imported = ButtonSampleRepo::insert_batch(&state.pool, id, &samples).await?;

    tracing::info!(video_id = %id, user_id = %auth.user_id, imported, "Button samples imported");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: ImportSummary {
                video_id: id,
                series: SeriesTarget::Button,
                imported,
            },
        }),
    ))
}

/// GET /api/v1/videos/{id}/data
pub async fn get_video_data(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<VideoData>>> {
    let video = find_video(&state, id).await?;
    let speed = SpeedSampleRepo::list_by_video(&state.pool, id).await?;
    let button = ButtonSampleRepo::list_by_video(&state.pool, id).await?;

    Ok(Json(DataResponse {
        data: VideoData {
            video_id: id,
            timestamp_offset: video.timestamp_offset,
            speed: speed.into_iter().map(AlignedSample::from).collect(),
            button: button.into_iter().map(AlignedSample::from).collect(),
        },
    }))
}

/// GET /api/v1/geolocation/{id}
pub async fn get_geolocation(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<LocationPoint>>>> {
    find_video(&state, id).await?;
    let track = SpeedSampleRepo::list_by_video(&state.pool, id)
        .await?
        .into_iter()
        .map(LocationPoint::from)
        .collect();
    Ok(Json(DataResponse { data: track }))
}
