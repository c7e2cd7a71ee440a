use std::net::SocketAddr;
use std::sync::Arc;

use dashlabel_api::background::inference::InferenceTasks;
use dashlabel_api::config::ServerConfig;
use dashlabel_api::inference::PlaceholderEngine;
use dashlabel_api::router::build_app_router;
use dashlabel_api::state::AppState;
use dashlabel_api::storage::build_blob_store;
use dashlabel_api::workflow::pg::PgStore;
use dashlabel_api::workflow::{AnnotationWorkflow, WorkflowConfig};
use dashlabel_core::clock::SystemClock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashlabel_api=debug,dashlabel_db=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        lock_ttl_secs = config.lock_ttl_secs,
        max_upload_bytes = config.max_upload_bytes,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = dashlabel_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    dashlabel_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    dashlabel_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready, migrations applied");

    // --- Services ---
    let blob_store = build_blob_store(&config.storage).await;
    tracing::info!(backend = blob_store.backend(), "Blob store ready");

    let workflow = AnnotationWorkflow::new(
        Arc::new(PgStore::new(pool.clone())),
        Arc::new(SystemClock),
        WorkflowConfig::from_ttl_secs(config.lock_ttl_secs),
    );
    let inference_tasks = InferenceTasks::new();

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        workflow: Arc::new(workflow),
        blob_store,
        inference: Arc::new(PlaceholderEngine),
        inference_tasks: inference_tasks.clone(),
    };
    let app = build_app_router(state, &config);

    // --- Serve ---
    let addr = SocketAddr::new(
        config.host.parse().expect("HOST must be an IP address"),
        config.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "dashlabel API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Uploads and lock changes are request-scoped; only inference outlives a
    // request.
    tracing::info!(
        in_flight = inference_tasks.in_flight(),
        "Server stopped, draining inference runs"
    );
    inference_tasks
        .shutdown(config.inference_shutdown_grace())
        .await;

    tracing::info!("Shutdown complete");
}

/// Resolves on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        () = ctrl_c => "SIGINT",
        () = terminate => "SIGTERM",
    };
    tracing::info!(signal, "Shutdown signal received");
}
