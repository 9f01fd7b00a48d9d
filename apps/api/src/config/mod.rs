//! Application settings.
//!
//! Defaults are layered with `APP_*` environment variables (a `.env` file is
//! honoured). See [`Config::load`].

use crate::error::{ApiError, Result};
use crate::services::recommendation::RetrievalLimits;
use config::{Environment, Source};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BOOKS_CSV_PATH: &str = "data/books_with_emotions.csv";
pub const DEFAULT_TAGGED_DESCRIPTIONS_PATH: &str = "data/tagged_description.txt";
pub const DEFAULT_COVER_FALLBACK: &str = "assets/cover-not-found.svg";
pub const DEFAULT_INITIAL_TOP_K: usize = 50;
pub const DEFAULT_FINAL_TOP_K: usize = 16;
pub const DEFAULT_JINA_BASE_URL: &str = "https://api.jina.ai";
pub const DEFAULT_JINA_MODEL_NAME: &str = "jina-embeddings-v2-base-en";
pub const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_EMBEDDING_RETRIES: u32 = 3;

/// Where nearest-neighbour candidates come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Embed the tagged description corpus at startup and search it in memory.
    Memory,
    /// Query a pre-populated Pinecone index.
    Pinecone,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub books_csv_path: PathBuf,
    pub tagged_descriptions_path: PathBuf,
    pub cover_fallback: String,
    pub initial_top_k: usize,
    pub final_top_k: usize,
    #[serde(default)]
    pub jina_api_key: String,
    pub jina_base_url: String,
    pub jina_model_name: String,
    pub embedding_timeout_secs: u64,
    pub embedding_retries: u32,
    pub vector_backend: VectorBackend,
    #[serde(default)]
    pub pinecone_api_key: Option<String>,
    #[serde(default)]
    pub pinecone_host: Option<String>,
    #[serde(default)]
    pub pinecone_namespace: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            books_csv_path: PathBuf::from(DEFAULT_BOOKS_CSV_PATH),
            tagged_descriptions_path: PathBuf::from(DEFAULT_TAGGED_DESCRIPTIONS_PATH),
            cover_fallback: DEFAULT_COVER_FALLBACK.to_string(),
            initial_top_k: DEFAULT_INITIAL_TOP_K,
            final_top_k: DEFAULT_FINAL_TOP_K,
            jina_api_key: String::new(),
            jina_base_url: DEFAULT_JINA_BASE_URL.to_string(),
            jina_model_name: DEFAULT_JINA_MODEL_NAME.to_string(),
            embedding_timeout_secs: DEFAULT_EMBEDDING_TIMEOUT_SECS,
            embedding_retries: DEFAULT_EMBEDDING_RETRIES,
            vector_backend: VectorBackend::Memory,
            pinecone_api_key: None,
            pinecone_host: None,
            pinecone_namespace: None,
        }
    }
}

impl Config {
    /// Load configuration from `APP_*` environment variables on top of the defaults.
    ///
    /// `JINA_API_KEY` is accepted as a fallback for `APP_JINA_API_KEY`.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_source(Environment::with_prefix("APP").try_parsing(true))?;

        if config.jina_api_key.trim().is_empty() {
            if let Ok(key) = env::var("JINA_API_KEY") {
                config.jina_api_key = key;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from the defaults overlaid with `source`.
    ///
    /// Does not validate; call [`Config::validate`] before use.
    pub fn from_source<S>(source: S) -> Result<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        let settings = config::Config::builder()
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", DEFAULT_PORT as i64)?
            .set_default("books_csv_path", DEFAULT_BOOKS_CSV_PATH)?
            .set_default("tagged_descriptions_path", DEFAULT_TAGGED_DESCRIPTIONS_PATH)?
            .set_default("cover_fallback", DEFAULT_COVER_FALLBACK)?
            .set_default("initial_top_k", DEFAULT_INITIAL_TOP_K as i64)?
            .set_default("final_top_k", DEFAULT_FINAL_TOP_K as i64)?
            .set_default("jina_base_url", DEFAULT_JINA_BASE_URL)?
            .set_default("jina_model_name", DEFAULT_JINA_MODEL_NAME)?
            .set_default(
                "embedding_timeout_secs",
                DEFAULT_EMBEDDING_TIMEOUT_SECS as i64,
            )?
            .set_default("embedding_retries", DEFAULT_EMBEDDING_RETRIES as i64)?
            .set_default("vector_backend", "memory")?
            .add_source(source)
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<()> {
        self.retrieval_limits()?;

        if self.jina_api_key.trim().is_empty() {
            return Err(ApiError::ConfigError(
                "APP_JINA_API_KEY (or JINA_API_KEY) must be set".to_string(),
            ));
        }

        if self.vector_backend == VectorBackend::Pinecone {
            let missing = |value: &Option<String>| {
                value.as_deref().map(str::trim).unwrap_or_default().is_empty()
            };
            if missing(&self.pinecone_api_key) {
                return Err(ApiError::ConfigError(
                    "APP_PINECONE_API_KEY must be set when using the pinecone backend".to_string(),
                ));
            }
            if missing(&self.pinecone_host) {
                return Err(ApiError::ConfigError(
                    "APP_PINECONE_HOST must be set when using the pinecone backend".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn retrieval_limits(&self) -> Result<RetrievalLimits> {
        RetrievalLimits::new(self.initial_top_k, self.final_top_k)
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }
}
