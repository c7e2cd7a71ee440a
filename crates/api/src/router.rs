//! HTTP router assembly.
//!
//! `main.rs` and the integration tests both go through [`build_app_router`],
//! so the tests see the same middleware the server runs with.

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// How long browsers may cache a CORS preflight answer.
const CORS_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Assemble the API and health routes and wrap them in middleware.
///
/// Outermost first, a request passes through:
///
/// - CORS
/// - request id assignment and a trace span, with the id echoed back
/// - the upload size cap
/// - panic recovery
/// - a timeout: `UPLOAD_TIMEOUT_SECS` for the video upload and
///   `REQUEST_TIMEOUT_SECS` for everything else
///
/// Video uploads are far larger than axum's 2 MB extractor default. That
/// default is switched off and `MAX_UPLOAD_BYTES` is enforced on the raw body
/// instead, which answers 413 before a handler reads anything.
pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let timed = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(timeout_layer(config.request_timeout_secs));
    let uploads = Router::new()
        .nest("/api/v1", routes::upload_routes())
        .layer(timeout_layer(config.upload_timeout_secs));

    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .merge(timed)
        .merge(uploads)
        .layer(CatchPanicLayer::new())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .layer(DefaultBodyLimit::disable())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(trace)
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(build_cors_layer(config))
        .with_state(state)
}

/// Answer 408 once a request, body included, has run for `secs`.
fn timeout_layer(secs: u64) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(secs))
}

/// CORS for the annotation frontend. Only `GET` and `POST` are routed.
///
/// # Panics
///
/// Panics on an origin that is not a valid header value. Origins come from
/// `CORS_ORIGINS` at startup.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => value,
            Err(e) => panic!("CORS_ORIGINS entry '{origin}' is not a valid origin: {e}"),
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE)
}
