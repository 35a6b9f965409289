pub mod paths;
pub mod service;
pub mod settings;
pub mod validation;

use std::path::PathBuf;

use thiserror::Error;

pub use paths::AppPaths;
pub use service::ConfigService;
pub use settings::{
    AppSettings, ElasticsearchSettings, LlmSettings, RagSettings, ServerSettings, StoreBackend,
    StoreSettings,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("{0}")]
    Invalid(String),
}
