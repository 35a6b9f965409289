//! The indexed document backend the pipeline reads from.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StoreError;

/// A short text document, immutable once indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub text: String,
}

impl Document {
    pub fn new(id: Uuid, text: impl Into<String>) -> Result<Self, StoreError> {
        let doc = Self {
            id,
            text: text.into(),
        };
        doc.validate()?;
        Ok(doc)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.text.is_empty() {
            return Err(StoreError::InvalidDocument(
                "document text must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome reported by the backend for an index call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    Created,
    Updated,
}

impl IndexStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexStatus::Created => "created",
            IndexStatus::Updated => "updated",
        }
    }
}

/// A search hit with the backend's relevance score (higher = better).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    #[serde(flatten)]
    pub document: Document,
    pub score: f32,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name reported by the status endpoint.
    fn backend(&self) -> &str;

    /// Index a document under its id, replacing any previous text.
    async fn index(&self, doc: &Document) -> Result<IndexStatus, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// Full-text search ordered by descending relevance, at most `limit` hits.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredDocument>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_rejected() {
        assert!(matches!(
            Document::new(Uuid::new_v4(), ""),
            Err(StoreError::InvalidDocument(_))
        ));
        assert!(Document::new(Uuid::new_v4(), " ").is_ok());
    }

    #[test]
    fn scored_document_serializes_flat() {
        let id = Uuid::new_v4();
        let hit = ScoredDocument {
            document: Document::new(id, "cats are great").unwrap(),
            score: 1.5,
        };
        assert_eq!(
            serde_json::to_value(&hit).unwrap(),
            serde_json::json!({ "id": id.to_string(), "text": "cats are great", "score": 1.5 })
        );
    }
}
