//! Test doubles shared by the tool tests.

use async_trait::async_trait;
use capstone_core::document::{DocumentChunk, ScoredChunk};
use capstone_core::error::{IndexError, ProviderError};
use capstone_core::index::VectorIndex;
use capstone_core::message::Message;
use capstone_core::provider::{Provider, ProviderRequest, ProviderResponse};
use capstone_providers::ModelGateway;
use std::sync::{Arc, Mutex};

/// Replies with canned texts in order and records every prompt it saw.
pub struct ScriptedModel {
    replies: Mutex<Vec<Result<String, ProviderError>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn gateway(replies: Vec<&str>) -> ModelGateway {
        let model = Self::new(replies.into_iter().map(|r| Ok(r.to_string())).collect());
        ModelGateway::new(model, "scripted")
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Provider for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let prompt = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt);

        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.is_empty() {
            Ok(String::new())
        } else {
            replies.remove(0)
        };
        reply.map(|text| ProviderResponse {
            message: Message::assistant(text),
            usage: None,
            model: request.model,
        })
    }
}

/// An index with nothing in it.
pub struct EmptyIndex;

#[async_trait]
impl VectorIndex for EmptyIndex {
    fn name(&self) -> &str {
        "empty"
    }

    async fn upsert(&self, chunks: &[DocumentChunk]) -> Result<usize, IndexError> {
        Ok(chunks.len())
    }

    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        Ok(Vec::new())
    }
}
