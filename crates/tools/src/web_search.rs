//! Web search tool: DuckDuckGo's HTML endpoint, scraped.
//!
//! Results whose snippet contains CJK ideographs are skipped.

use async_trait::async_trait;
use capstone_core::error::ToolError;
use capstone_core::tool::Tool;
use regex_lite::Regex;
use std::sync::LazyLock;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
pub const NO_RESULTS: &str = "No English results found.";

// Wide enough that a title or snippet never wraps.
const FRAGMENT_WIDTH: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

pub struct WebSearchTool {
    client: reqwest::Client,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(client: reqwest::Client, max_results: usize) -> Self {
        Self { client, max_results }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web for information. Use this when the answer is not in the uploaded \
         documents or your own knowledge. Pass the search query directly."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let failed = |reason: String| ToolError::ExecutionFailed {
            tool_name: "search_web".into(),
            reason,
        };

        let response = self
            .client
            .post(SEARCH_URL)
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| failed(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(format!("Search failed with status code: {}", status.as_u16()));
        }

        let html = response
            .text()
            .await
            .map_err(|e| failed(format!("failed to read results: {e}")))?;

        let hits = parse_results(&html, self.max_results);
        tracing::debug!(query, hits = hits.len(), "Web search");
        Ok(render(&hits))
    }
}

// Result blocks, then the title anchor and snippet inside one block.
static BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class="result[ "]"#).expect("valid result block pattern"));

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a[^>]*class="result__a"[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#).expect("valid title pattern")
});

static SNIPPET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a[^>]*class="result__snippet"[^>]*>(.*?)</a>"#).expect("valid snippet pattern")
});

/// Pull title, link and snippet out of each result block, in page order.
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for block in BLOCK_RE.split(html).skip(1) {
        if hits.len() >= limit {
            break;
        }
        let (Some(title), Some(snippet)) = (TITLE_RE.captures(block), SNIPPET_RE.captures(block)) else {
            continue;
        };
        let snippet = fragment_text(&snippet[1]);
        if snippet.chars().any(is_cjk) {
            continue;
        }
        hits.push(SearchHit {
            title: fragment_text(&title[2]),
            link: fragment_text(&title[1]),
            snippet,
        });
    }
    hits
}

pub fn render(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return NO_RESULTS.to_string();
    }
    hits.iter()
        .map(|h| format!("Title: {}\nLink: {}\nSnippet: {}", h.title, h.link, h.snippet))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Render an HTML fragment as one line of plain text.
fn fragment_text(fragment: &str) -> String {
    match html2text::config::plain_no_decorate().string_from_read(fragment.as_bytes(), FRAGMENT_WIDTH) {
        Ok(text) => text.split_whitespace().collect::<Vec<_>>().join(" "),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to render result fragment");
            String::new()
        }
    }
}
