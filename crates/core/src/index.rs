//! VectorIndex trait: embedding storage with similarity search.
//!
//! The ingestion pipeline writes through `upsert`; the `search_documents`
//! capability reads through `search`. Embedding happens behind this trait.

use crate::document::{DocumentChunk, ScoredChunk};
use crate::error::IndexError;
use async_trait::async_trait;

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name (e.g., "memory", "pinecone").
    fn name(&self) -> &str;

    /// Embed and store chunks, replacing any entry with the same chunk id.
    /// Returns the number of chunks written.
    async fn upsert(&self, chunks: &[DocumentChunk]) -> std::result::Result<usize, IndexError>;

    /// The `k` chunks most similar to `query`, best first.
    ///
    /// An index with no matching content returns an empty list, not an error.
    async fn search(&self, query: &str, k: usize) -> std::result::Result<Vec<ScoredChunk>, IndexError>;

    /// Number of stored entries, when the backend can tell cheaply.
    async fn count(&self) -> std::result::Result<Option<usize>, IndexError> {
        Ok(None)
    }
}
