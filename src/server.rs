//! HTTP front end exposing the summarizer as a JSON API.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::Result;
use crate::fetch::validate_video_url;
use crate::workflow::Workflow;

pub struct AppState {
    pub workflow: Arc<Workflow>,
    pub default_prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeBody {
    pub video_url: Option<String>,
    pub prompt: Option<String>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/summarize", post(summarize))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve until the process is stopped
pub async fn serve(state: Arc<AppState>, bind_address: &str, port: u16) -> Result<()> {
    let addr = format!("{}:{}", bind_address, port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP API listening");

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}

async fn summarize(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<SummarizeBody>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(_) => return failure(StatusCode::BAD_REQUEST, "Video URL is required"),
    };

    let Some(video_url) = body
        .video_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
    else {
        return failure(StatusCode::BAD_REQUEST, "Video URL is required");
    };

    if validate_video_url(&video_url).is_err() {
        return failure(StatusCode::BAD_REQUEST, "Invalid URL format");
    }

    let prompt = body
        .prompt
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| state.default_prompt.clone());

    let request_id = Uuid::new_v4();
    info!(%request_id, video_url = %video_url, "Summarize request");

    let workflow = Arc::clone(&state.workflow);
    let url = video_url.clone();
    let outcome = tokio::spawn(async move { workflow.summarize(&url, &prompt).await }).await;

    match outcome {
        Ok(Ok(summary)) => {
            info!(%request_id, "Summarize request completed");
            Json(json!({
                "success": true,
                "summary": summary.text,
                "video_url": video_url,
            }))
            .into_response()
        }
        Ok(Err(e)) => {
            error!(%request_id, kind = e.kind(), "Summarize request failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string(), "kind": e.kind() })),
            )
                .into_response()
        }
        Err(e) => {
            error!(%request_id, "Summarize task aborted: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "message": "Video Summarizer API is running" }))
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Video Summarizer API",
        "endpoints": {
            "POST /api/summarize": "Summarize a video",
            "GET /api/health": "Health check",
        }
    }))
}
