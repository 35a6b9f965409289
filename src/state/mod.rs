use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::{AppPaths, AppSettings, ConfigService};
use crate::llm::{CompletionModel, OpenAiCompatModel};
use crate::rag::{
    GenerationCache, PipelineConfig, PromptTruncator, RagPipeline, RelevanceRetriever,
};
use crate::store::{self, DocumentStore};

pub mod error;

use error::InitializationError;

/// Shared application state handed to every route.
///
/// Holds:
/// - Resolved settings
/// - The document store (also reachable through the retriever)
/// - The generation cache and the answer pipeline built on top of it
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<AppSettings>,
    pub store: Arc<dyn DocumentStore>,
    pub retriever: RelevanceRetriever,
    pub cache: Arc<GenerationCache>,
    pub pipeline: Arc<RagPipeline>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// 1. Loads and validates `config.yml` (merged with `secrets.yaml`)
    /// 2. Opens the configured document store
    /// 3. Builds the completion client and the prompt truncator
    /// 4. Wires the retriever, cache and pipeline together
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let store = store::open_store(&settings.store, paths.as_ref())
            .await
            .map_err(|e| InitializationError::Store(e.into()))?;

        let model = Arc::new(
            OpenAiCompatModel::new(&settings.llm)
                .map_err(|e| InitializationError::Llm(e.into()))?,
        );

        let truncator = match settings.llm.tokenizer_path.as_deref() {
            Some(raw) => {
                let path = paths.resolve(raw);
                tracing::info!("Loading tokenizer from {}", path.display());
                PromptTruncator::from_tokenizer_file(&path, settings.llm.max_input_tokens)
                    .map_err(InitializationError::Tokenizer)?
            }
            None => PromptTruncator::words(settings.llm.max_input_tokens),
        };

        Ok(Arc::new(Self::assemble(settings, store, model, truncator)))
    }

    /// Builds state from already-constructed parts, counting prompt words as tokens.
    pub fn from_parts(
        settings: AppSettings,
        store: Arc<dyn DocumentStore>,
        model: Arc<dyn CompletionModel>,
    ) -> Arc<Self> {
        let truncator = PromptTruncator::words(settings.llm.max_input_tokens);
        Arc::new(Self::assemble(settings, store, model, truncator))
    }

    fn assemble(
        settings: AppSettings,
        store: Arc<dyn DocumentStore>,
        model: Arc<dyn CompletionModel>,
        truncator: PromptTruncator,
    ) -> Self {
        let retriever = RelevanceRetriever::new(store.clone());
        let cache = Arc::new(
            GenerationCache::new(
                model,
                settings.rag.cache_capacity,
                settings.llm.max_output_tokens,
            )
            .with_truncator(truncator),
        );
        let pipeline = Arc::new(RagPipeline::new(
            retriever.clone(),
            cache.clone(),
            PipelineConfig::from(&settings.rag),
        ));

        tracing::info!(
            store = store.backend(),
            model = cache.model_id(),
            cache_capacity = settings.rag.cache_capacity,
            "Application state ready"
        );

        AppState {
            settings: Arc::new(settings),
            store,
            retriever,
            cache,
            pipeline,
            started_at: Utc::now(),
        }
    }
}
