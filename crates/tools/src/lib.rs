//! Built-in capabilities for the Capstone agent.
//!
//! Each tool is a leaf behind the `Tool` trait: document search, arithmetic,
//! text statistics and transforms, web fetch and search, and charting.
//! The orchestrator only sees the registry built here.

pub mod calculator;
pub mod generate_chart;
pub mod read_document_intro;
pub mod search_documents;
pub mod sentiment_analyzer;
pub mod text_summarizer;
pub mod translator;
pub mod url_fetcher;
pub mod visualization_demo;
pub mod web_search;
pub mod word_counter;

#[cfg(test)]
pub(crate) mod test_support;

use capstone_config::ToolsConfig;
use capstone_core::index::VectorIndex;
use capstone_core::tool::ToolRegistry;
use capstone_providers::ModelGateway;
use std::sync::Arc;
use std::time::Duration;

/// Shared collaborators for the tools that call out of process.
#[derive(Clone)]
pub struct ToolContext {
    pub index: Arc<dyn VectorIndex>,
    pub gateway: ModelGateway,
    pub config: ToolsConfig,
    pub top_k: usize,
}

impl ToolContext {
    /// HTTP client for url_fetcher and search_web.
    pub fn http_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.http_timeout_secs))
            .user_agent(self.config.user_agent.clone())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            })
    }
}

/// Create the registry holding all eleven built-in tools.
pub fn default_registry(ctx: ToolContext) -> ToolRegistry {
    let http = ctx.http_client();
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(search_documents::SearchDocumentsTool::new(
        ctx.index.clone(),
        ctx.top_k,
        ctx.config.passage_preview_chars,
    )));
    registry.register(Box::new(calculator::CalculatorTool));
    registry.register(Box::new(word_counter::WordCounterTool));
    registry.register(Box::new(text_summarizer::TextSummarizerTool::new(ctx.gateway.clone())));
    registry.register(Box::new(sentiment_analyzer::SentimentAnalyzerTool));
    registry.register(Box::new(url_fetcher::UrlFetcherTool::new(
        http.clone(),
        ctx.config.url_fetch_max_chars,
    )));
    registry.register(Box::new(translator::TranslatorTool::new(ctx.gateway.clone())));
    registry.register(Box::new(generate_chart::GenerateChartTool::new(ctx.gateway.clone())));
    registry.register(Box::new(web_search::WebSearchTool::new(
        http,
        ctx.config.web_search_max_results,
    )));
    registry.register(Box::new(visualization_demo::VisualizationDemoTool));
    registry.register(Box::new(read_document_intro::ReadDocumentIntroTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{EmptyIndex, ScriptedModel};

    #[test]
    fn registry_holds_every_tool() {
        let ctx = ToolContext {
            index: Arc::new(EmptyIndex),
            gateway: ScriptedModel::gateway(vec![]),
            config: ToolsConfig::default(),
            top_k: 3,
        };
        let registry = default_registry(ctx);
        assert_eq!(
            registry.names(),
            vec![
                "calculator",
                "generate_chart",
                "read_document_intro",
                "search_documents",
                "search_web",
                "sentiment_analyzer",
                "text_summarizer",
                "translator",
                "url_fetcher",
                "visualization_demo",
                "word_counter",
            ]
        );
    }
}
