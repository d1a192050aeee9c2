//! Read document intro tool.
//!
//! Uploaded files are embedded and discarded, never kept on disk, so there is
//! nothing to read sequentially. The tool says so and points at search.

use async_trait::async_trait;
use capstone_core::error::ToolError;
use capstone_core::tool::Tool;

pub const NOT_RETAINED_NOTE: &str = "Note: The system currently processes files into a vector database for semantic search and does not persist the original file on disk for sequential reading. Use 'search_documents' to find specific topics.";

pub struct ReadDocumentIntroTool;

#[async_trait]
impl Tool for ReadDocumentIntroTool {
    fn name(&self) -> &str {
        "read_document_intro"
    }

    fn description(&self) -> &str {
        "Read the first characters of the most recently uploaded document."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "num_chars": {
                    "type": "integer",
                    "description": "Number of characters to read (default 2000)",
                    "default": 2000
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let num_chars = arguments["num_chars"].as_u64().unwrap_or(2000);
        tracing::debug!(num_chars, "Sequential document read requested");
        Ok(NOT_RETAINED_NOTE.to_string())
    }
}
