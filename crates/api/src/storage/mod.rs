//! Blob storage for uploaded video files.
//!
//! Handlers only see the [`BlobStore`] trait. Two backends exist: a local
//! directory ([`local::LocalBlobStore`]) for development and tests, and an
//! S3-compatible bucket ([`s3::S3BlobStore`]) for deployments.

pub mod local;
pub mod s3;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashlabel_core::storage::{validate_backend, BACKEND_LOCAL, BACKEND_S3};

/// Default directory for the local backend.
const DEFAULT_LOCAL_DIR: &str = "storage";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which backend stores video bytes, and where.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Local {
        root: PathBuf,
    },
    S3 {
        bucket: String,
        /// Custom endpoint for S3-compatible services (MinIO, R2, ...).
        endpoint_url: Option<String>,
        region: Option<String>,
    },
}

impl StorageConfig {
    /// Load storage configuration from environment variables.
    ///
    /// | Env Var              | Default   |
    /// |----------------------|-----------|
    /// | `STORAGE_BACKEND`    | `local`   |
    /// | `STORAGE_LOCAL_DIR`  | `storage` |
    /// | `S3_BUCKET_NAME`     | required when the backend is `s3` |
    /// | `S3_ENDPOINT_URL`    | unset     |
    /// | `S3_REGION`          | SDK default chain |
    ///
    /// # Panics
    ///
    /// Panics on an unknown backend or a missing bucket name.
    pub fn from_env() -> Self {
        let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| BACKEND_LOCAL.into());
        if let Err(e) = validate_backend(&backend) {
            panic!("STORAGE_BACKEND is invalid: {e}");
        }

        if backend == BACKEND_S3 {
            let bucket = std::env::var("S3_BUCKET_NAME")
                .expect("S3_BUCKET_NAME must be set when STORAGE_BACKEND=s3");
            Self::S3 {
                bucket,
                endpoint_url: std::env::var("S3_ENDPOINT_URL").ok(),
                region: std::env::var("S3_REGION").ok(),
            }
        } else {
            let root = std::env::var("STORAGE_LOCAL_DIR")
                .unwrap_or_else(|_| DEFAULT_LOCAL_DIR.into())
                .into();
            Self::Local { root }
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Write-side interface to blob storage, keyed by storage key
/// (see `dashlabel_core::storage::video_storage_key`).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Backend identifier for logs (`local` or `s3`).
    fn backend(&self) -> &'static str;

    /// Store the file at `source` under `key`. `source` is left in place for
    /// the caller to remove.
    async fn put_file(
        &self,
        key: &str,
        source: &Path,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Remove a blob. Deleting a key that does not exist succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Construct the configured backend.
pub async fn build_blob_store(config: &StorageConfig) -> Arc<dyn BlobStore> {
    match config {
        StorageConfig::Local { root } => Arc::new(local::LocalBlobStore::new(root.clone())),
        StorageConfig::S3 {
            bucket,
            endpoint_url,
            region,
        } => Arc::new(
            s3::S3BlobStore::from_env(bucket.clone(), endpoint_url.clone(), region.clone()).await,
        ),
    }
}
