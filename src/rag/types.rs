use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RagError;
use crate::store::ScoredDocument;

/// Free-text question entering the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Parses a `{"text": ...}` request body.
    ///
    /// A missing `text` is the empty query; anything other than a JSON object
    /// with an optional string `text` is rejected.
    pub fn from_json(body: &Value) -> Result<Self, RagError> {
        let object = body
            .as_object()
            .ok_or_else(|| RagError::InvalidInput("request body must be a JSON object".into()))?;

        match object.get("text") {
            None | Some(Value::Null) => Ok(Self::new("")),
            Some(Value::String(text)) => Ok(Self::new(text.as_str())),
            Some(_) => Err(RagError::InvalidInput("'text' must be a string".into())),
        }
    }
}

/// Search hits in descending relevance order, bounded by the retrieval limit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RetrievedSet {
    documents: Vec<ScoredDocument>,
}

impl RetrievedSet {
    pub fn documents(&self) -> &[ScoredDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl From<Vec<ScoredDocument>> for RetrievedSet {
    fn from(documents: Vec<ScoredDocument>) -> Self {
        Self { documents }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub query: String,
    pub answer: String,
}
