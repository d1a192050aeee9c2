//! Translator tool: one model completion with a fixed prompt.

use async_trait::async_trait;
use capstone_core::error::ToolError;
use capstone_core::tool::Tool;
use capstone_providers::ModelGateway;

pub struct TranslatorTool {
    gateway: ModelGateway,
}

impl TranslatorTool {
    pub fn new(gateway: ModelGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for TranslatorTool {
    fn name(&self) -> &str {
        "translator"
    }

    fn description(&self) -> &str {
        "Translate text into a target language."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The text to translate"
                },
                "target_language": {
                    "type": "string",
                    "description": "The language to translate into, e.g. 'French'"
                }
            },
            "required": ["text", "target_language"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let text = arguments["text"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;
        let language = arguments["target_language"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'target_language' argument".into()))?;

        let prompt = format!("Translate the following text to {language}:\n\n{text}");
        Ok(self.gateway.generate(&prompt).await?)
    }
}
