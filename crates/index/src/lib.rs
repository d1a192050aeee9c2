//! Vector index clients for Capstone.
//!
//! All backends implement `capstone_core::VectorIndex` and embed text through
//! the configured model provider.

pub mod embedder;
pub mod in_memory;
pub mod pinecone;
pub mod vector;

pub use embedder::Embedder;
pub use in_memory::InMemoryIndex;
pub use pinecone::{PineconeIndex, PineconeSettings};
pub use vector::{cosine_similarity, rank_by_similarity};

use capstone_core::error::IndexError;
use capstone_core::index::VectorIndex;
use capstone_core::provider::Provider;
use std::sync::Arc;

/// Build the configured index backend.
pub async fn build_from_config(
    config: &capstone_config::AppConfig,
    provider: Arc<dyn Provider>,
) -> Result<Arc<dyn VectorIndex>, IndexError> {
    let embedder = Embedder::new(provider, &config.index.embedding_model);
    match config.index.backend.as_str() {
        "pinecone" => {
            let settings = PineconeSettings {
                api_key: config.index.pinecone_api_key.clone().unwrap_or_default(),
                index_name: config.index.pinecone_index.clone(),
                namespace: config.index.pinecone_namespace.clone(),
                dimension: config.index.dimension,
                cloud: config.index.cloud.clone(),
                region: config.index.region.clone(),
            };
            Ok(Arc::new(PineconeIndex::connect(settings, embedder).await?))
        }
        "memory" => Ok(Arc::new(InMemoryIndex::new(embedder))),
        other => Err(IndexError::NotConfigured(format!("unknown index backend '{other}'"))),
    }
}
