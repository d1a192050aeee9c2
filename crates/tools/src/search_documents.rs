//! Document search tool: semantic search over ingested documents.
//!
//! Delegates straight to the vector index; no re-ranking or filtering.
//! An empty hit list is a normal answer, an unreachable index is an error.

use async_trait::async_trait;
use capstone_core::error::ToolError;
use capstone_core::index::VectorIndex;
use capstone_core::tool::Tool;
use std::sync::Arc;

pub const NO_RESULTS: &str = "No relevant information found in the documents.";

pub struct SearchDocumentsTool {
    index: Arc<dyn VectorIndex>,
    top_k: usize,
    preview_chars: usize,
}

impl SearchDocumentsTool {
    pub fn new(index: Arc<dyn VectorIndex>, top_k: usize, preview_chars: usize) -> Self {
        Self {
            index,
            top_k,
            preview_chars,
        }
    }
}

#[async_trait]
impl Tool for SearchDocumentsTool {
    fn name(&self) -> &str {
        "search_documents"
    }

    fn description(&self) -> &str {
        "Search the uploaded documents for passages relevant to a query. \
         Use this whenever the user asks about the content of their documents."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look for in the documents"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let hits = self.index.search(query, self.top_k).await?;
        tracing::debug!(index = self.index.name(), hits = hits.len(), "Document search");

        if hits.is_empty() {
            return Ok(NO_RESULTS.to_string());
        }

        let passages: Vec<String> = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                let preview: String = hit.chunk.text.chars().take(self.preview_chars).collect();
                format!("[Passage {}]: {}...", i + 1, preview)
            })
            .collect();
        Ok(passages.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::EmptyIndex;
    use capstone_core::document::{DocumentChunk, ScoredChunk};
    use capstone_core::error::IndexError;
    use std::sync::Mutex;

    struct FixedIndex {
        hits: Vec<ScoredChunk>,
        requested_k: Mutex<Option<usize>>,
    }

    #[async_trait]
    impl VectorIndex for FixedIndex {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn upsert(&self, chunks: &[DocumentChunk]) -> Result<usize, IndexError> {
            Ok(chunks.len())
        }

        async fn search(&self, _query: &str, k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
            *self.requested_k.lock().unwrap() = Some(k);
            Ok(self.hits.iter().take(k).cloned().collect())
        }
    }

    struct DownIndex;

    #[async_trait]
    impl VectorIndex for DownIndex {
        fn name(&self) -> &str {
            "down"
        }

        async fn upsert(&self, _chunks: &[DocumentChunk]) -> Result<usize, IndexError> {
            Err(IndexError::Unreachable("connection refused".into()))
        }

        async fn search(&self, _query: &str, _k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
            Err(IndexError::Unreachable("connection refused".into()))
        }
    }

    fn hit(seq: usize, text: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: DocumentChunk {
                id: DocumentChunk::chunk_id("doc", seq),
                document_id: "doc".into(),
                source: "report.pdf".into(),
                page: Some(1),
                sequence: seq,
                text: text.into(),
            },
            score: 0.9,
        }
    }

    #[tokio::test]
    async fn empty_index_is_not_an_error() {
        let tool = SearchDocumentsTool::new(Arc::new(EmptyIndex), 3, 500);
        let out = tool.execute(serde_json::json!({"query": "revenue"})).await.unwrap();
        assert_eq!(out, NO_RESULTS);
    }

    #[tokio::test]
    async fn passages_are_numbered_and_previewed() {
        let index = Arc::new(FixedIndex {
            hits: vec![hit(0, "Revenue grew 12%."), hit(1, &"x".repeat(800))],
            requested_k: Mutex::new(None),
        });
        let tool = SearchDocumentsTool::new(index.clone(), 3, 500);
        let out = tool.execute(serde_json::json!({"query": "revenue"})).await.unwrap();

        let passages: Vec<&str> = out.split("\n\n").collect();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0], "[Passage 1]: Revenue grew 12%....");
        assert_eq!(passages[1], format!("[Passage 2]: {}...", "x".repeat(500)));
        assert_eq!(*index.requested_k.lock().unwrap(), Some(3));
    }

    #[tokio::test]
    async fn unreachable_index_is_an_upstream_error() {
        let tool = SearchDocumentsTool::new(Arc::new(DownIndex), 3, 500);
        let err = tool.execute(serde_json::json!({"query": "q"})).await.unwrap_err();
        assert!(matches!(err, ToolError::Upstream(_)));
        assert!(err.to_string().contains("connection refused"));
    }
}
