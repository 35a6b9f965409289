use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Request(String),
    #[error("completion server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed completion response: {0}")]
    Malformed(String),
}

impl LlmError {
    pub fn request<E: std::fmt::Display>(err: E) -> Self {
        LlmError::Request(err.to_string())
    }
}

#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// model identifier sent to the server (e.g. "gpt2")
    fn model_id(&self) -> &str;

    /// single completion for an already-truncated prompt
    async fn complete(&self, prompt: &str, max_output_tokens: usize) -> Result<String, LlmError>;
}
