//! Text embedding through the model provider.

use capstone_core::error::IndexError;
use capstone_core::provider::{EmbeddingRequest, Provider};
use std::sync::Arc;

/// A provider bound to an embedding model.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl Embedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One vector per input, in input order.
    pub async fn embed(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, IndexError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let expected = inputs.len();
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs,
            })
            .await?;
        if response.embeddings.len() != expected {
            return Err(IndexError::Embedding(format!(
                "expected {expected} embeddings, got {}",
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings)
    }

    pub async fn embed_one(&self, input: &str) -> Result<Vec<f32>, IndexError> {
        let mut vectors = self.embed(vec![input.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| IndexError::Embedding("provider returned no embedding".into()))
    }
}
