//! Upload validation and blob storage key layout.

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default maximum accepted video size (500 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 500 * 1024 * 1024;

/// Prefix under which all uploaded videos are stored.
pub const VIDEO_KEY_PREFIX: &str = "videos";

/// Longest filename kept in a storage key.
const MAX_KEY_FILENAME_LENGTH: usize = 128;

/// Storage backend identifiers.
pub const BACKEND_LOCAL: &str = "local";
pub const BACKEND_S3: &str = "s3";

const VALID_BACKENDS: &[&str] = &[BACKEND_LOCAL, BACKEND_S3];

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Only `video/*` uploads are accepted.
pub fn validate_video_content_type(content_type: Option<&str>) -> Result<(), CoreError> {
    match content_type {
        Some(ct) if ct.trim().to_ascii_lowercase().starts_with("video/") => Ok(()),
        Some(ct) => Err(CoreError::Validation(format!(
            "Invalid file type '{ct}'. Expected a video/* upload"
        ))),
        None => Err(CoreError::Validation(
            "Missing content type. Expected a video/* upload".into(),
        )),
    }
}

pub fn validate_backend(backend: &str) -> Result<(), CoreError> {
    if VALID_BACKENDS.contains(&backend) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unknown storage backend '{backend}'. Must be one of: {VALID_BACKENDS:?}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Reduce a client-supplied filename to a safe single path segment.
///
/// Directory components are dropped and anything outside
/// `[A-Za-z0-9._-]` becomes `_`. Empty results fall back to `video`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_KEY_FILENAME_LENGTH)
        .collect();

    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned
    }
}

/// Storage key for an uploaded video: `videos/{user}/{video}/{filename}`.
pub fn video_storage_key(user_id: DbId, video_id: DbId, filename: &str) -> String {
    format!(
        "{VIDEO_KEY_PREFIX}/{user_id}/{video_id}/{}",
        sanitize_filename(filename)
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
