//! Model gateway: a provider bound to a model and sampling settings.
//!
//! The orchestrator and the LLM-backed capabilities (summarize, translate,
//! chart generation) talk to the model through this type so they share one
//! configuration and never assemble provider requests themselves.

use capstone_core::error::ProviderError;
use capstone_core::message::Message;
use capstone_core::provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
use std::sync::Arc;

#[derive(Clone)]
pub struct ModelGateway {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ModelGateway {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Build from the configured default provider and model.
    pub fn from_config(config: &capstone_config::AppConfig, router: &crate::ProviderRouter) -> Result<Self, ProviderError> {
        let provider = router.default().ok_or_else(|| {
            ProviderError::NotConfigured(format!("provider '{}' is not registered", config.default_provider))
        })?;
        Ok(Self::new(provider, &config.default_model)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// One model call over `system` followed by `history`, with `tools` declared.
    pub async fn invoke(
        &self,
        system: &str,
        history: &[Message],
        tools: Vec<ToolDefinition>,
    ) -> Result<ProviderResponse, ProviderError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(system));
        messages.extend_from_slice(history);

        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools,
        };
        self.provider.complete(request).await
    }

    /// Single-prompt text generation with no tools declared.
    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: Vec::new(),
        };
        let response = self.provider.complete(request).await?;
        Ok(response.message.content)
    }
}
