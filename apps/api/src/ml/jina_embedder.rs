use crate::{
    config::Config,
    error::{ApiError, Result},
    ml::Embedder,
};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_CONNECTION_TIMEOUT_SECONDS: u64 = 15;
const DEFAULT_RETRY_DELAY_MS: u64 = 500;
const MAX_RETRY_DELAY_MS: u64 = 8_000;
const MAX_BACKOFF_EXPONENT: u32 = 16;

// Text processing limits
const MAX_TEXT_PREVIEW_LENGTH: usize = 100;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Client for the Jina AI embeddings API (`POST {base_url}/v1/embeddings`).
#[derive(Clone)]
pub struct JinaEmbedder {
    client: Client,
    api_key: String,
    endpoint: String,
    model_name: String,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl JinaEmbedder {
    pub fn new(config: &Config) -> Result<Self> {
        if config.jina_api_key.trim().is_empty() {
            return Err(ApiError::ConfigError(
                "Jina API key is empty".to_string(),
            ));
        }

        info!(
            "Initializing Jina client with model: {}, timeout: {}s, retries: {}",
            config.jina_model_name, config.embedding_timeout_secs, config.embedding_retries
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.embedding_timeout_secs))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECONDS))
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .build()
            .map_err(|e| ApiError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.jina_api_key.clone(),
            endpoint: format!(
                "{}/v1/embeddings",
                config.jina_base_url.trim_end_matches('/')
            ),
            model_name: config.jina_model_name.clone(),
            retry_attempts: config.embedding_retries.max(1),
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Override the base backoff delay between retries.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    async fn request_once(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, Attempt> {
        let request = EmbeddingRequest {
            model: &self.model_name,
            input: texts,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Attempt::Retryable(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    "authentication failed, check the Jina API key".to_string()
                }
                StatusCode::TOO_MANY_REQUESTS => "rate limit exceeded".to_string(),
                _ => format!("embedding service returned {}: {}", status, text),
            };
            return Err(if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                Attempt::Retryable(message)
            } else {
                Attempt::Fatal(message)
            });
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Attempt::Fatal(format!("malformed embedding response: {}", e)))?;

        order_embeddings(body, texts.len()).map_err(Attempt::Fatal)
    }
}

enum Attempt {
    Retryable(String),
    Fatal(String),
}

/// Put vectors back in input order and check the count and dimensions.
fn order_embeddings(
    body: EmbeddingResponse,
    expected: usize,
) -> std::result::Result<Vec<Vec<f32>>, String> {
    if body.data.len() != expected {
        return Err(format!(
            "expected {} embeddings, got {}",
            expected,
            body.data.len()
        ));
    }

    let mut data = body.data;
    data.sort_by_key(|d| d.index);
    if data.iter().enumerate().any(|(i, d)| d.index != i) {
        return Err("embedding response indices are not contiguous".to_string());
    }

    let embeddings: Vec<Vec<f32>> = data.into_iter().map(|d| d.embedding).collect();
    if let Some(first) = embeddings.first() {
        if first.is_empty() || embeddings.iter().any(|e| e.len() != first.len()) {
            return Err("embedding response has inconsistent dimensions".to_string());
        }
    }

    Ok(embeddings)
}

/// Exponential backoff before retrying after `attempt` (1-based), capped at
/// [`MAX_RETRY_DELAY_MS`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    base.saturating_mul(1u32 << exponent)
        .min(Duration::from_millis(MAX_RETRY_DELAY_MS))
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(MAX_TEXT_PREVIEW_LENGTH).collect();
    if text.chars().count() > MAX_TEXT_PREVIEW_LENGTH {
        preview.push_str("...");
    }
    preview
}

#[async_trait]
impl Embedder for JinaEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Encoding {} text(s), first: {}",
            texts.len(),
            preview(&texts[0])
        );

        let mut attempt = 1;
        loop {
            match self.request_once(texts).await {
                Ok(embeddings) => {
                    debug!(
                        "Got {} embedding(s) of size {}",
                        embeddings.len(),
                        embeddings.first().map(Vec::len).unwrap_or_default()
                    );
                    return Ok(embeddings);
                }
                Err(Attempt::Retryable(message)) if attempt < self.retry_attempts => {
                    let delay = backoff_delay(self.retry_delay, attempt);
                    warn!(
                        "Embedding attempt {}/{} failed: {}. Retrying in {}ms",
                        attempt,
                        self.retry_attempts,
                        message,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(Attempt::Retryable(message)) | Err(Attempt::Fatal(message)) => {
                    return Err(ApiError::RetrievalUnavailable(message));
                }
            }
        }
    }
}
