use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database does not answer.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Where uploaded videos are stored (`local` or `s3`).
    pub storage_backend: &'static str,
}

/// GET /health
///
/// Always 200 so load balancers can tell "up but degraded" from "down".
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = dashlabel_db::health_check(&state.pool)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Database health check failed"))
        .is_ok();

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        storage_backend: state.blob_store.backend(),
    })
}

/// Mounted at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
