//! Document store backends.
//!
//! - `SqliteDocumentStore`: embedded default, term-frequency relevance
//! - `ElasticsearchStore`: remote index queried with `match` queries

mod document_store;
mod elasticsearch;
mod sqlite;

use std::sync::Arc;

use thiserror::Error;

pub use document_store::{Document, DocumentStore, IndexStatus, ScoredDocument};
pub use elasticsearch::ElasticsearchStore;
pub use sqlite::SqliteDocumentStore;

use crate::core::config::{AppPaths, StoreBackend, StoreSettings};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed document store response: {0}")]
    Malformed(String),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

impl StoreError {
    pub fn unavailable<E: std::fmt::Display>(err: E) -> Self {
        StoreError::Unavailable(err.to_string())
    }

    pub fn malformed<E: std::fmt::Display>(err: E) -> Self {
        StoreError::Malformed(err.to_string())
    }
}

/// Opens the backend selected by `store.backend`.
pub async fn open_store(
    settings: &StoreSettings,
    paths: &AppPaths,
) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match settings.backend {
        StoreBackend::Sqlite => {
            let db_path = paths.resolve(&settings.sqlite_path);
            tracing::info!("Opening SQLite document store at {}", db_path.display());
            Ok(Arc::new(SqliteDocumentStore::with_path(db_path).await?))
        }
        StoreBackend::Elasticsearch => {
            tracing::info!(
                "Using Elasticsearch document store at {} (index '{}')",
                settings.elasticsearch.url,
                settings.elasticsearch.index
            );
            Ok(Arc::new(ElasticsearchStore::new(&settings.elasticsearch)?))
        }
    }
}
