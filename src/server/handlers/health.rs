use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    // null when the store cannot be reached
    let documents = match state.store.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!("Failed to count documents: {}", e);
            None
        }
    };

    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0);

    Ok(Json(json!({
        "store": {
            "backend": state.store.backend(),
            "documents": documents,
        },
        "model": state.cache.model_id(),
        "cache": state.cache.stats(),
        "started_at": state.started_at.to_rfc3339(),
        "uptime_secs": uptime_secs,
    })))
}
