//! Word counter tool: whitespace-separated word count.

use async_trait::async_trait;
use capstone_core::error::ToolError;
use capstone_core::tool::Tool;

pub struct WordCounterTool;

#[async_trait]
impl Tool for WordCounterTool {
    fn name(&self) -> &str {
        "word_counter"
    }

    fn description(&self) -> &str {
        "Count the number of words in a text."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The text whose words should be counted"
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let text = arguments["text"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;

        Ok(format!("Word count: {}", text.split_whitespace().count()))
    }
}
