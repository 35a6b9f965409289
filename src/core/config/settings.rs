//! Typed view of `config.yml`.
//!
//! Every section falls back to its defaults, so an absent config file
//! yields a runnable local setup (embedded SQLite store, completion server
//! on `127.0.0.1:8080`).

use serde::{Deserialize, Serialize};

pub const DEFAULT_FALLBACK_ANSWER: &str = "No relevant documents found to generate an answer.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub llm: LlmSettings,
    pub rag: RagSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Empty means the local defaults in the router.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Elasticsearch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Relative paths resolve against the user data dir.
    pub sqlite_path: String,
    pub elasticsearch: ElasticsearchSettings,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            sqlite_path: "documents.db".to_string(),
            elasticsearch: ElasticsearchSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchSettings {
    pub url: String,
    pub index: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// `false` accepts self-signed certificates.
    pub verify_certs: bool,
    pub timeout_secs: u64,
}

impl Default for ElasticsearchSettings {
    fn default() -> Self {
        Self {
            url: "https://localhost:9200".to_string(),
            index: "documents".to_string(),
            username: None,
            password: None,
            verify_certs: true,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible completion server.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_input_tokens: usize,
    pub max_output_tokens: usize,
    pub seed: u64,
    pub timeout_secs: u64,
    /// HuggingFace `tokenizer.json`; whitespace words are counted when absent.
    pub tokenizer_path: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            model: "gpt2".to_string(),
            api_key: None,
            max_input_tokens: 1024,
            max_output_tokens: 100,
            seed: 42,
            timeout_secs: 60,
            tokenizer_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Result size of plain `/search`.
    pub search_limit: usize,
    /// Documents retrieved as generation context.
    pub context_limit: usize,
    pub cache_capacity: usize,
    pub generation_timeout_secs: u64,
    pub fallback_answer: String,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            search_limit: 3,
            context_limit: 5,
            cache_capacity: 100,
            generation_timeout_secs: 120,
            fallback_answer: DEFAULT_FALLBACK_ANSWER.to_string(),
        }
    }
}
