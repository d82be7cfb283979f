use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::error::IngestError;
use crate::ingest::types::RunOptions;
use crate::ingest::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/ingest", post(ingest))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// `POST /ingest`. The body is optional; an empty or absent body runs with
/// configured defaults.
async fn ingest(State(state): State<AppState>, body: String) -> Response {
    let opts = if body.trim().is_empty() {
        RunOptions::default()
    } else {
        match serde_json::from_str::<RunOptions>(&body) {
            Ok(o) => o,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("invalid options: {e}") })),
                )
                    .into_response()
            }
        }
    };

    match state.pipeline.run(opts).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e @ IngestError::Config(_)) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
