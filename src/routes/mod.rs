//! Router assembly: HTTP endpoints, WebSocket upgrade, body limit, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Images arrive base64-encoded inside JSON, so allow bodies well above axum's 2 MiB default.
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Build the application router with:
/// - `POST /v1/analyze` (JSON) and `POST /v1/analyze/upload` (multipart)
/// - `POST /v1/anki/export` returning CSV
/// - `GET /health`
/// - WebSocket at `/ws`
/// - CORS (allow any origin/method/headers) and a per-request trace span
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .route("/health", get(http::http_health))
        .route("/v1/analyze", post(http::http_post_analyze))
        .route("/v1/analyze/upload", post(http::http_post_analyze_upload))
        .route("/v1/anki/export", post(http::http_post_anki_export))
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
