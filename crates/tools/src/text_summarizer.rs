//! Text summarizer tool: one model completion with a fixed prompt.

use async_trait::async_trait;
use capstone_core::error::ToolError;
use capstone_core::tool::Tool;
use capstone_providers::ModelGateway;

pub struct TextSummarizerTool {
    gateway: ModelGateway,
}

impl TextSummarizerTool {
    pub fn new(gateway: ModelGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for TextSummarizerTool {
    fn name(&self) -> &str {
        "text_summarizer"
    }

    fn description(&self) -> &str {
        "Summarize a piece of text concisely."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The text to summarize"
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let text = arguments["text"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;

        let prompt = format!("Summarize the following text concisely:\n\n{text}");
        Ok(self.gateway.generate(&prompt).await?)
    }
}
