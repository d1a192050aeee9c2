//! URL fetcher tool: GET a page and return its readable text.
//!
//! HTML is rendered to plain text, blank lines are dropped and the result is
//! truncated so a single page cannot flood the model's context.

use async_trait::async_trait;
use capstone_core::error::ToolError;
use capstone_core::tool::Tool;

const RENDER_WIDTH: usize = 400;

pub struct UrlFetcherTool {
    client: reqwest::Client,
    max_chars: usize,
}

impl UrlFetcherTool {
    pub fn new(client: reqwest::Client, max_chars: usize) -> Self {
        Self { client, max_chars }
    }

    fn failed(&self, reason: impl std::fmt::Display) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Tool for UrlFetcherTool {
    fn name(&self) -> &str {
        "url_fetcher"
    }

    fn description(&self) -> &str {
        "Fetch a web page and return its text content."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch (http:// or https://)"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let url = arguments["url"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ToolError::InvalidArguments(
                "URL must start with http:// or https://".into(),
            ));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.failed(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Ok(format!("Error: Status code {}", status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.failed(format!("failed to read body: {e}")))?;
        let text = page_text(&body).map_err(|e| self.failed(e))?;
        tracing::debug!(url, chars = text.chars().count(), "Fetched page");

        Ok(truncate(&text, self.max_chars))
    }
}

/// Render HTML to text, one non-blank trimmed line per output line.
pub fn page_text(html: &str) -> Result<String, String> {
    let rendered = html2text::from_read(html.as_bytes(), RENDER_WIDTH)
        .map_err(|e| format!("failed to render HTML: {e}"))?;

    Ok(rendered
        .lines()
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|phrase| !phrase.is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Cut `text` to `max_chars`, noting the original length when it was cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    let length = text.chars().count();
    if length <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars).collect();
    format!("{kept}\n\n... [Content Truncated due to size limit. Original length: {length} chars]")
}
