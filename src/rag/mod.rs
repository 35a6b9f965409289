//! Retrieval-augmented answer generation.
//!
//! - `RelevanceRetriever`: top-K lookup against the document store
//! - `GenerationCache`: memoized, coalesced model completions
//! - `RagPipeline`: retrieve, assemble, generate, clean

mod cache;
pub mod dedup;
mod error;
mod pipeline;
pub mod prompt;
mod retriever;
mod types;

pub use cache::{CacheStats, GenerationCache};
pub use error::RagError;
pub use pipeline::{PipelineConfig, RagPipeline};
pub use prompt::PromptTruncator;
pub use retriever::RelevanceRetriever;
pub use types::{GeneratedAnswer, Query, RetrievedSet};
