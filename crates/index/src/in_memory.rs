//! In-process vector index: the default backend and the test double.
//!
//! Entries live only for the process lifetime.

use crate::embedder::Embedder;
use crate::vector::rank_by_similarity;
use async_trait::async_trait;
use capstone_core::document::{DocumentChunk, ScoredChunk};
use capstone_core::error::IndexError;
use capstone_core::index::VectorIndex;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

struct IndexEntry {
    chunk: DocumentChunk,
    embedding: Vec<f32>,
}

/// Cosine-similarity index held in a Vec.
pub struct InMemoryIndex {
    embedder: Embedder,
    entries: Arc<RwLock<Vec<IndexEntry>>>,
}

impl InMemoryIndex {
    pub fn new(embedder: Embedder) -> Self {
        Self {
            embedder,
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, chunks: &[DocumentChunk]) -> Result<usize, IndexError> {
        let texts = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed(texts).await?;

        let mut entries = self.entries.write().await;
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            match entries.iter_mut().find(|e| e.chunk.id == chunk.id) {
                Some(existing) => {
                    existing.chunk = chunk.clone();
                    existing.embedding = embedding;
                }
                None => entries.push(IndexEntry {
                    chunk: chunk.clone(),
                    embedding,
                }),
            }
        }
        debug!(written = chunks.len(), total = entries.len(), "Upserted chunks");
        Ok(chunks.len())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        if k == 0 || self.entries.read().await.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_one(query).await?;
        let entries = self.entries.read().await;
        let ranked = rank_by_similarity(entries.iter().map(|e| e.embedding.as_slice()), &query_embedding, k);

        Ok(ranked
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: entries[i].chunk.clone(),
                score,
            })
            .collect())
    }

    async fn count(&self) -> Result<Option<usize>, IndexError> {
        Ok(Some(self.entries.read().await.len()))
    }
}
