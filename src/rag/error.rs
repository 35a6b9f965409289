use thiserror::Error;

/// Failures surfaced by the answer pipeline. None are retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RagError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),
    #[error("generation failed: {0}")]
    GenerationFailed(String),
}
