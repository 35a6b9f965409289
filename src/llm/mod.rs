pub mod openai_compat;
pub mod provider;

pub use openai_compat::OpenAiCompatModel;
pub use provider::{CompletionModel, LlmError};
