use serde::{Deserialize, Serialize};

// Re-export types from book.rs
pub use book::{BookRecord, CategoryFilter, Emotion, EmotionScores, Tone, UnknownTone, ALL};

mod book;

/// Request structure for book recommendations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    /// Free-text description of the book the user is looking for
    pub query: String,
    /// Category label, or "All" for no category filter
    #[serde(default = "default_filter")]
    pub category: String,
    /// Emotional tone, or "All" to keep relevance order
    #[serde(default = "default_filter")]
    pub tone: String,
}

/// A single gallery entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Cover image URL or path
    pub image: String,
    /// "{title} by {authors}: {description}..."
    pub caption: String,
}

/// Response structure for book recommendations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<Recommendation>,
    /// Category filter that was applied
    pub category: String,
    /// Tone filter that was applied
    pub tone: String,
}

/// Choices for the category and tone dropdowns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltersResponse {
    pub categories: Vec<String>,
    pub tones: Vec<String>,
}

/// Health check response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in RFC3339 format
    pub timestamp: String,
    /// Number of books in the metadata store
    pub books: usize,
}

fn default_filter() -> String {
    ALL.to_string()
}
