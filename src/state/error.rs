use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to open document store: {0}")]
    Store(#[source] anyhow::Error),

    #[error("Failed to initialize completion model: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to load tokenizer: {0}")]
    Tokenizer(String),
}
