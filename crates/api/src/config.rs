use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dashlabel_core::lock::{validate_ttl, DEFAULT_LOCK_TTL_SECS};
use dashlabel_core::storage::DEFAULT_MAX_UPLOAD_BYTES;

use crate::auth::jwt::JwtConfig;
use crate::storage::StorageConfig;

/// Server configuration, read once at startup.
///
/// Only `JWT_SECRET` (and `S3_BUCKET_NAME` for the S3 backend) has no
/// default. Everything else works out of the box for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Parsed from the comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// Applies to every route except the video upload.
    pub request_timeout_secs: u64,
    /// Applies to the video upload only.
    pub upload_timeout_secs: u64,
    pub jwt: JwtConfig,
    /// Seconds after which an unreleased annotation lock may be taken over.
    pub lock_ttl_secs: i64,
    /// Largest accepted request body, which bounds video uploads.
    pub max_upload_bytes: usize,
    /// Where uploads are written while they stream in, before they reach
    /// blob storage.
    pub upload_spool_dir: PathBuf,
    /// How long in-flight inference runs may finish after shutdown starts.
    pub inference_shutdown_grace_secs: u64,
    pub storage: StorageConfig,
}

/// Read `name` and parse it, falling back to `default` when unset.
///
/// # Panics
///
/// Panics when the variable is set but does not parse.
fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name}='{raw}' is invalid: {e}")),
        Err(_) => default,
    }
}

impl ServerConfig {
    /// Load configuration from the environment.
    ///
    /// | Env Var                          | Default                 |
    /// |----------------------------------|-------------------------|
    /// | `HOST`                           | `0.0.0.0`               |
    /// | `PORT`                           | `3000`                  |
    /// | `CORS_ORIGINS`                   | `http://localhost:3000` |
    /// | `REQUEST_TIMEOUT_SECS`           | `30`                    |
    /// | `UPLOAD_TIMEOUT_SECS`            | `3600`                  |
    /// | `LOCK_TTL_SECS`                  | `3600`                  |
    /// | `MAX_UPLOAD_BYTES`               | `524288000` (500 MiB)   |
    /// | `UPLOAD_SPOOL_DIR`               | system temp dir         |
    /// | `INFERENCE_SHUTDOWN_GRACE_SECS`  | `10`                    |
    ///
    /// JWT settings are read by [`JwtConfig::from_env`] and storage settings
    /// by [`StorageConfig::from_env`].
    ///
    /// # Panics
    ///
    /// Panics on malformed values so misconfiguration stops the process
    /// before it binds.
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let lock_ttl_secs = env_or("LOCK_TTL_SECS", DEFAULT_LOCK_TTL_SECS);
        if let Err(e) = validate_ttl(lock_ttl_secs) {
            panic!("LOCK_TTL_SECS is invalid: {e}");
        }

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            upload_timeout_secs: env_or("UPLOAD_TIMEOUT_SECS", 3600),
            jwt: JwtConfig::from_env(),
            lock_ttl_secs,
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            upload_spool_dir: env_or("UPLOAD_SPOOL_DIR", std::env::temp_dir()),
            inference_shutdown_grace_secs: env_or("INFERENCE_SHUTDOWN_GRACE_SECS", 10),
            storage: StorageConfig::from_env(),
        }
    }

    pub fn inference_shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.inference_shutdown_grace_secs)
    }
}
