use std::sync::Arc;

use super::{RagError, RetrievedSet};
use crate::store::DocumentStore;

/// Read-only top-K lookup against the document store.
#[derive(Clone)]
pub struct RelevanceRetriever {
    store: Arc<dyn DocumentStore>,
}

impl RelevanceRetriever {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// At most `limit` documents, ordered by descending store score.
    ///
    /// Empty-query behavior is the store's. Store failures become
    /// `RetrievalUnavailable`.
    pub async fn retrieve(&self, query: &str, limit: usize) -> Result<RetrievedSet, RagError> {
        if limit == 0 {
            return Err(RagError::InvalidInput(
                "retrieval limit must be at least 1".to_string(),
            ));
        }

        let mut hits = self.store.search(query, limit).await.map_err(|e| {
            tracing::warn!("Document search failed: {}", e);
            RagError::RetrievalUnavailable(e.to_string())
        })?;

        // Backends already rank; the stable sort only guards the ordering contract.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);

        tracing::debug!(query, limit, retrieved = hits.len(), "Retrieved documents");
        Ok(hits.into())
    }
}
