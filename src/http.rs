use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, header::CONTENT_TYPE},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, warn};

use crate::{
    error::DownloadError,
    model::{DownloadPayload, DownloadResult},
    pipeline::DownloadPipeline,
};

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Clone)]
pub struct AppState {
    pipeline: DownloadPipeline,
    shutdown: CancellationToken,
}

impl AppState {
    /// `shutdown` is the parent of every job's cancellation token.
    pub fn new(pipeline: DownloadPipeline, shutdown: CancellationToken) -> Self {
        Self { pipeline, shutdown }
    }
}

/// Route table. Anything not listed here answers 404.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/index.html", get(index))
        .route("/health", get(health))
        .route("/download", post(start_download))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .with_state(state)
        .layer(build_cors_layer())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn start_download(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: DownloadPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(error) => {
            warn!("rejected download body: {error}");
            let error = DownloadError::validation(format!("Invalid request body: {error}"));
            return (StatusCode::BAD_REQUEST, Json(DownloadResult::failed(&error))).into_response();
        }
    };

    // Dropping the handler future (client went away) cancels the job.
    let cancel = state.shutdown.child_token();
    let _cancel_on_drop = cancel.clone().drop_guard();

    Json(state.pipeline.run(payload, cancel).await).into_response()
}
