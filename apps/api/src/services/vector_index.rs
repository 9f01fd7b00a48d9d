use crate::{
    error::{ApiError, Result},
    ml::Embedder,
    services::tagged_document::TaggedDocument,
};
use async_trait::async_trait;
use indicatif::ProgressBar;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info};

/// Batch size used when embedding the corpus at startup.
pub const INDEX_BATCH_SIZE: usize = 32;

/// One nearest-neighbour candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchHit {
    pub isbn13: u64,
    pub score: f32,
}

/// Nearest-neighbour search over book embeddings.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `k` hits, most similar first.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>>;
}

/// Exact cosine-similarity search over an embedded corpus held in memory.
pub struct InMemoryIndex {
    ids: Vec<u64>,
    /// Row-normalized embeddings, one row per document.
    vectors: Array2<f32>,
}

fn normalize(vector: ArrayView1<f32>) -> Array1<f32> {
    let magnitude = vector.dot(&vector).sqrt();
    if magnitude > 0.0 {
        vector.mapv(|x| x / magnitude)
    } else {
        Array1::zeros(vector.len())
    }
}

impl InMemoryIndex {
    /// Build from `(isbn13, embedding)` pairs. All embeddings must share one dimension.
    pub fn from_embeddings(entries: Vec<(u64, Vec<f32>)>) -> Result<Self> {
        let dimension = entries.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut ids = Vec::with_capacity(entries.len());
        let mut flat = Vec::with_capacity(entries.len() * dimension);

        for (isbn13, vector) in entries {
            if vector.len() != dimension {
                return Err(ApiError::LoadError(format!(
                    "embedding for {} has dimension {}, expected {}",
                    isbn13,
                    vector.len(),
                    dimension
                )));
            }
            let row = normalize(ArrayView1::from(&vector[..]));
            ids.push(isbn13);
            flat.extend(row.iter());
        }

        let vectors = Array2::from_shape_vec((ids.len(), dimension), flat)
            .map_err(|e| ApiError::LoadError(format!("failed to shape index: {}", e)))?;

        Ok(Self { ids, vectors })
    }

    /// Embed every document with `embedder` and index the results.
    ///
    /// Any embedding failure aborts the build.
    pub async fn build(embedder: &dyn Embedder, documents: &[TaggedDocument]) -> Result<Self> {
        info!("Embedding {} documents for the in-memory index", documents.len());

        let total_batches = documents.len().div_ceil(INDEX_BATCH_SIZE);
        let mut entries = Vec::with_capacity(documents.len());
        let progress = ProgressBar::new(documents.len() as u64);

        for (batch_index, batch) in documents.chunks(INDEX_BATCH_SIZE).enumerate() {
            let texts: Vec<String> = batch.iter().map(TaggedDocument::encode).collect();
            let embeddings = embedder.embed_batch(&texts).await.map_err(|e| {
                ApiError::LoadError(format!(
                    "failed to embed batch {} of {}: {}",
                    batch_index + 1,
                    total_batches,
                    e
                ))
            })?;

            if embeddings.len() != batch.len() {
                return Err(ApiError::LoadError(format!(
                    "batch {} returned {} embeddings for {} documents",
                    batch_index + 1,
                    embeddings.len(),
                    batch.len()
                )));
            }

            entries.extend(batch.iter().map(|d| d.isbn13).zip(embeddings));
            progress.inc(batch.len() as u64);
            debug!("Embedded batch {} of {}", batch_index + 1, total_batches);
        }
        progress.finish_and_clear();

        let index = Self::from_embeddings(entries)?;
        info!(
            "In-memory index ready: {} vectors of dimension {}",
            index.len(),
            index.dimension()
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if vector.len() != self.dimension() {
            return Err(ApiError::RetrievalUnavailable(format!(
                "query vector has dimension {}, index expects {}",
                vector.len(),
                self.dimension()
            )));
        }

        let query = normalize(ArrayView1::from(vector));
        let scores = self.vectors.dot(&query);

        let mut hits: Vec<SearchHit> = self
            .ids
            .iter()
            .zip(scores.iter())
            .map(|(&isbn13, &score)| SearchHit { isbn13, score })
            .collect();

        // Stable: equal scores keep corpus order.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(k);

        debug!(
            "In-memory search returned {} hits (k={}, corpus={})",
            hits.len(),
            k,
            self.vectors.len_of(Axis(0))
        );
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Embeds a document as a one-hot vector keyed by its first character.
    struct FirstLetterEmbedder {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl Embedder for FirstLetterEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            *self.calls.lock().unwrap() += 1;
            Ok(texts
                .iter()
                .map(|t| {
                    let text = TaggedDocument::decode(t).map(|d| d.text).unwrap_or_default();
                    let mut v = vec![0.0; 3];
                    match text.chars().next() {
                        Some('a') => v[0] = 1.0,
                        Some('b') => v[1] = 1.0,
                        _ => v[2] = 1.0,
                    }
                    v
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_query_orders_by_cosine_similarity() {
        let index = InMemoryIndex::from_embeddings(vec![
            (1, vec![1.0, 0.0]),
            (2, vec![0.0, 5.0]),
            (3, vec![1.0, 1.0]),
        ])
        .unwrap();

        let hits = index.query(&[0.0, 2.0], 3).await.unwrap();
        let ids: Vec<u64> = hits.iter().map(|h| h.isbn13).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_query_truncates_to_k_and_keeps_ties_stable() {
        let index = InMemoryIndex::from_embeddings(vec![
            (10, vec![1.0, 0.0]),
            (11, vec![2.0, 0.0]),
            (12, vec![3.0, 0.0]),
        ])
        .unwrap();

        let hits = index.query(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<u64> = hits.iter().map(|h| h.isbn13).collect();
        assert_eq!(ids, vec![10, 11]);
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let index = InMemoryIndex::from_embeddings(vec![(1, vec![1.0, 0.0])]).unwrap();
        let result = index.query(&[1.0, 0.0, 0.0], 1).await;
        assert!(matches!(result, Err(ApiError::RetrievalUnavailable(_))));
    }

    #[test]
    fn test_mixed_dimensions_rejected() {
        let result = InMemoryIndex::from_embeddings(vec![(1, vec![1.0, 0.0]), (2, vec![1.0])]);
        assert!(matches!(result, Err(ApiError::LoadError(_))));
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let index = InMemoryIndex::from_embeddings(Vec::new()).unwrap();
        assert!(index.query(&[1.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_build_embeds_in_batches() {
        let documents: Vec<TaggedDocument> = (0..(INDEX_BATCH_SIZE as u64 + 5))
            .map(|i| TaggedDocument::new(i, if i == 7 { "about bees" } else { "zebras" }))
            .collect();
        let embedder = FirstLetterEmbedder {
            calls: Mutex::new(0),
        };

        let index = InMemoryIndex::build(&embedder, &documents).await.unwrap();
        assert_eq!(index.len(), documents.len());
        assert_eq!(*embedder.calls.lock().unwrap(), 2);

        let hits = index.query(&[1.0, 0.0, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].isbn13, 7);
    }
}
