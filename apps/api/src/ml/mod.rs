pub mod jina_embedder;

pub use jina_embedder::JinaEmbedder;

use crate::error::{ApiError, Result};
use async_trait::async_trait;

/// Turns text into fixed-dimension vectors.
///
/// Failures are reported as [`ApiError::RetrievalUnavailable`].
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed each text, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ApiError::RetrievalUnavailable("embedding service returned no vectors".to_string())
            })
    }
}
