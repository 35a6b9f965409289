use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{documents, generate, health, search};
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
///
/// - Health and status endpoints
/// - Document indexing, lookup and search
/// - Answer generation
///
/// Collection routes also answer with a trailing slash, the form older
/// clients of this API call.
/// - CORS and request tracing layers
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.cors_allowed_origins);
    Router::new()
        .route("/health", get(health::health))
        .route("/api/status", get(health::get_status))
        .route("/documents", post(documents::create_document))
        .route("/documents/", post(documents::create_document))
        .route("/documents/:document_id", get(documents::get_document))
        .route("/search", get(search::search_documents))
        .route("/search/", get(search::search_documents))
        .route("/generate-answer", post(generate::generate_answer))
        .route("/generate-answer/", post(generate::generate_answer))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(configured: &[String]) -> CorsLayer {
    let allowed_origins = resolve_allowed_origins(configured)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    let origins = configured
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_local_origins();
    }

    origins
}

fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://localhost:8000".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
        "http://127.0.0.1:8000".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_origins_fall_back_to_local_defaults() {
        let origins = resolve_allowed_origins(&["  ".to_string()]);
        assert_eq!(origins, default_local_origins());
    }

    #[test]
    fn configured_origins_are_trimmed() {
        let origins = resolve_allowed_origins(&[" https://app.example.com ".to_string()]);
        assert_eq!(origins, vec!["https://app.example.com".to_string()]);
    }
}
