use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

pub async fn search_documents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params
        .query
        .ok_or_else(|| ApiError::InvalidInput("missing 'query' parameter".to_string()))?;

    let results = state
        .retriever
        .retrieve(&query, state.settings.rag.search_limit)
        .await?;

    Ok(Json(json!({
        "query": query,
        "total": results.len(),
        "results": results,
    })))
}
