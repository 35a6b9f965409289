use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::rag::Query;
use crate::state::AppState;

pub async fn generate_answer(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let query = Query::from_json(&body)?;

    let answer = state.pipeline.answer(&query.text).await?;

    Ok(Json(json!({
        "query": answer.query,
        "generated_answer": answer.answer,
    })))
}
