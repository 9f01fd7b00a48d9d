pub mod caption;
pub mod pinecone;
pub mod recommendation;
pub mod tagged_document;
pub mod vector_index;

// Re-export public types
pub use pinecone::PineconeIndex;
pub use recommendation::{RecommendationService, RetrievalLimits};
pub use tagged_document::TaggedDocument;
pub use vector_index::{InMemoryIndex, SearchHit, VectorIndex};
