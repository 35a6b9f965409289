use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::rag::RagError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),
    #[error("generation failed: {0}")]
    GenerationFailed(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    /// Stable tag carried in every error body.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::NotFound(_) => "not_found",
            ApiError::RetrievalUnavailable(_) => "retrieval_unavailable",
            ApiError::GenerationFailed(_) => "generation_failed",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RetrievalUnavailable(_) | ApiError::ServiceUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            RagError::RetrievalUnavailable(msg) => ApiError::RetrievalUnavailable(msg),
            RagError::GenerationFailed(msg) => ApiError::GenerationFailed(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidDocument(msg) => ApiError::InvalidInput(msg),
            other => ApiError::ServiceUnavailable(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            ApiError::InvalidInput(msg)
            | ApiError::NotFound(msg)
            | ApiError::RetrievalUnavailable(msg)
            | ApiError::GenerationFailed(msg)
            | ApiError::ServiceUnavailable(msg) => msg.clone(),
        };

        let body = Json(json!({ "error": message, "kind": self.kind() }));
        (status, body).into_response()
    }
}
