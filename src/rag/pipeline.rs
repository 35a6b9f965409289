//! Retrieve → assemble → generate → clean.

use std::sync::Arc;
use std::time::Duration;

use super::cache::GenerationCache;
use super::dedup;
use super::prompt;
use super::retriever::RelevanceRetriever;
use super::{GeneratedAnswer, RagError};
use crate::core::config::RagSettings;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Documents retrieved as generation context.
    pub context_limit: usize,
    /// Caller-level bound on a single generation step.
    pub generation_timeout: Duration,
    /// Returned when retrieval finds nothing to build a prompt from.
    pub fallback_answer: String,
}

impl From<&RagSettings> for PipelineConfig {
    fn from(settings: &RagSettings) -> Self {
        Self {
            context_limit: settings.context_limit,
            generation_timeout: Duration::from_secs(settings.generation_timeout_secs),
            fallback_answer: settings.fallback_answer.clone(),
        }
    }
}

/// Answers free-text questions from indexed documents.
///
/// Stateless across calls apart from the shared generation cache. Calls may
/// run concurrently; each call's steps run strictly in order.
pub struct RagPipeline {
    retriever: RelevanceRetriever,
    cache: Arc<GenerationCache>,
    config: PipelineConfig,
}

impl RagPipeline {
    pub fn new(
        retriever: RelevanceRetriever,
        cache: Arc<GenerationCache>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            retriever,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<GenerationCache> {
        &self.cache
    }

    pub async fn answer(&self, query: &str) -> Result<GeneratedAnswer, RagError> {
        let docs = self
            .retriever
            .retrieve(query, self.config.context_limit)
            .await?;

        let prompt = prompt::assemble(&docs);
        if prompt.is_empty() {
            tracing::debug!(query, "No context retrieved; returning fallback answer");
            return Ok(GeneratedAnswer {
                query: query.to_string(),
                answer: self.config.fallback_answer.clone(),
            });
        }

        let generated = tokio::time::timeout(
            self.config.generation_timeout,
            self.cache.generate(&prompt),
        )
        .await
        .map_err(|_| {
            tracing::warn!(
                "Generation timed out after {:?}",
                self.config.generation_timeout
            );
            RagError::GenerationFailed(format!(
                "timed out after {}s",
                self.config.generation_timeout.as_secs()
            ))
        })??;

        Ok(GeneratedAnswer {
            query: query.to_string(),
            answer: dedup::clean(&generated),
        })
    }
}
