use crate::{
    error::{ApiError, Result},
    ml::Embedder,
    models::{BookRecord, CategoryFilter, Recommendation, Tone},
    services::{
        caption::to_recommendation,
        vector_index::{SearchHit, VectorIndex},
    },
    store::BookStore,
};
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, info};

pub const DEFAULT_INITIAL_TOP_K: usize = 50;
pub const DEFAULT_FINAL_TOP_K: usize = 16;

/// Candidate pool size and result size. Always `initial >= final >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalLimits {
    initial_top_k: usize,
    final_top_k: usize,
}

impl RetrievalLimits {
    pub fn new(initial_top_k: usize, final_top_k: usize) -> Result<Self> {
        if final_top_k < 1 || initial_top_k < final_top_k {
            return Err(ApiError::InvalidRequest(format!(
                "top-k bounds must satisfy initial_top_k >= final_top_k >= 1 (got {} and {})",
                initial_top_k, final_top_k
            )));
        }
        Ok(Self {
            initial_top_k,
            final_top_k,
        })
    }

    pub fn initial_top_k(&self) -> usize {
        self.initial_top_k
    }

    pub fn final_top_k(&self) -> usize {
        self.final_top_k
    }
}

impl Default for RetrievalLimits {
    fn default() -> Self {
        Self {
            initial_top_k: DEFAULT_INITIAL_TOP_K,
            final_top_k: DEFAULT_FINAL_TOP_K,
        }
    }
}

/// Map hits to records in relevance order. Unknown identifiers are skipped
/// and each book appears at most once, at its best-ranked position.
fn join_candidates(store: &BookStore, hits: &[SearchHit], limit: usize) -> Vec<BookRecord> {
    let mut seen = HashSet::with_capacity(hits.len());
    hits.iter()
        .filter(|hit| seen.insert(hit.isbn13))
        .filter_map(|hit| {
            let record = store.get(hit.isbn13);
            if record.is_none() {
                debug!("Index hit {} has no metadata, dropping", hit.isbn13);
            }
            record.cloned()
        })
        .take(limit)
        .collect()
}

fn filter_by_category(
    books: Vec<BookRecord>,
    category: &CategoryFilter,
    limit: usize,
) -> Vec<BookRecord> {
    books
        .into_iter()
        .filter(|book| category.matches(&book.category))
        .take(limit)
        .collect()
}

/// Stable descending sort by the tone's emotion score; `None` keeps the order.
fn rerank_by_tone(books: &mut [BookRecord], tone: Option<Tone>) {
    if let Some(tone) = tone {
        let emotion = tone.emotion();
        books.sort_by(|a, b| {
            b.emotions
                .score(emotion)
                .total_cmp(&a.emotions.score(emotion))
        });
    }
}

/// Query → embedding → nearest neighbours → metadata join → category filter
/// → tone rerank.
#[derive(Clone)]
pub struct RecommendationService {
    store: Arc<BookStore>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    limits: RetrievalLimits,
}

impl RecommendationService {
    pub fn new(
        store: Arc<BookStore>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        limits: RetrievalLimits,
    ) -> Self {
        Self {
            store,
            embedder,
            index,
            limits,
        }
    }

    pub fn store(&self) -> &BookStore {
        &self.store
    }

    pub fn limits(&self) -> RetrievalLimits {
        self.limits
    }

    /// Ranked book records for `query`, at most `final_top_k` long.
    ///
    /// The candidate pool is truncated to `initial_top_k` before the category
    /// filter runs, so a category can come back short even when more matching
    /// books exist further down the index.
    pub async fn retrieve(
        &self,
        query: &str,
        category: &CategoryFilter,
        tone: Option<Tone>,
        initial_top_k: usize,
        final_top_k: usize,
    ) -> Result<Vec<BookRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::InvalidRequest("Query cannot be empty".into()));
        }
        let limits = RetrievalLimits::new(initial_top_k, final_top_k)?;

        let embedding = self.embedder.embed(query).await.map_err(into_retrieval)?;
        let hits = self
            .index
            .query(&embedding, limits.initial_top_k)
            .await
            .map_err(into_retrieval)?;
        debug!("Vector search returned {} candidates", hits.len());

        let joined = join_candidates(&self.store, &hits, limits.initial_top_k);
        let mut books = filter_by_category(joined, category, limits.final_top_k);
        rerank_by_tone(&mut books, tone);

        info!(
            "Returning {} books for query '{}' (category: {}, tone: {})",
            books.len(),
            query,
            category.label(),
            tone.map(|t| t.label()).unwrap_or("All")
        );
        Ok(books)
    }

    /// Gallery entries for `query` using the configured limits.
    pub async fn recommend(
        &self,
        query: &str,
        category: &CategoryFilter,
        tone: Option<Tone>,
    ) -> Result<Vec<Recommendation>> {
        let books = self
            .retrieve(
                query,
                category,
                tone,
                self.limits.initial_top_k,
                self.limits.final_top_k,
            )
            .await?;

        Ok(books.iter().map(to_recommendation).collect())
    }
}

/// Collaborator failures are reported uniformly as retrieval failures.
fn into_retrieval(err: ApiError) -> ApiError {
    match err {
        ApiError::RetrievalUnavailable(_) => err,
        other => ApiError::RetrievalUnavailable(other.to_string()),
    }
}
