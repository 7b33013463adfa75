use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let uploads_ready = tokio::fs::metadata(&state.config.uploads_dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    let body = json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "uploadsReady": uploads_ready,
    });
    (StatusCode::OK, Json(body))
}
