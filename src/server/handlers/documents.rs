use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::state::AppState;
use crate::store::Document;

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub id: Uuid,
    pub text: String,
}

pub async fn create_document(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateDocumentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let document = Document::new(request.id, request.text)?;

    let status = state.store.index(&document).await.map_err(|e| {
        tracing::error!("Failed to index document {}: {}", document.id, e);
        ApiError::from(e)
    })?;

    tracing::info!(id = %document.id, status = status.as_str(), "Indexed document");
    Ok(Json(json!({
        "status": status,
        "id": document.id,
    })))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    document_id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(document_id) = document_id.map_err(|e| ApiError::InvalidInput(e.body_text()))?;

    match state.store.get(document_id).await? {
        Some(document) => Ok(Json(json!({
            "id": document.id,
            "text": document.text,
        }))),
        None => Err(ApiError::NotFound("Document not found".to_string())),
    }
}
