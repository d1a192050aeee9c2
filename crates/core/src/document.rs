//! Source documents and the chunks derived from them.

use serde::{Deserialize, Serialize};

/// One decoded unit of a source document: a PDF page, a whole text file,
/// or the body of a word-processing document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSection {
    /// 1-based page number, when the format has pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    pub text: String,
}

impl SourceSection {
    pub fn text(text: impl Into<String>) -> Self {
        Self { page: None, text: text.into() }
    }

    pub fn page(page: u32, text: impl Into<String>) -> Self {
        Self { page: Some(page), text: text.into() }
    }
}

/// A decoded document ready for chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Stable id derived from filename and content
    pub id: String,

    /// Originating filename
    pub filename: String,

    pub sections: Vec<SourceSection>,
}

/// A bounded span of a source document; the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// `<document_id>-<sequence>`
    pub id: String,

    pub document_id: String,

    /// Originating filename
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Position within the document, global across sections
    pub sequence: usize,

    pub text: String,
}

impl DocumentChunk {
    pub fn chunk_id(document_id: &str, sequence: usize) -> String {
        format!("{document_id}-{sequence}")
    }
}

/// A search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}
