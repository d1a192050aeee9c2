//! Error types for the Capstone domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Capstone operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Vector index errors ---
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    // --- Ingestion errors ---
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    // --- Orchestration errors ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures talking to the model gateway.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),
}

/// Failures inside a single capability call.
///
/// These never terminate a conversation turn: the registry folds them into
/// a textual tool result at the dispatch boundary.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("{tool_name} failed: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Upstream call failed: {0}")]
    Upstream(String),
}

impl From<ProviderError> for ToolError {
    fn from(err: ProviderError) -> Self {
        ToolError::Upstream(err.to_string())
    }
}

impl From<IndexError> for ToolError {
    fn from(err: IndexError) -> Self {
        ToolError::Upstream(err.to_string())
    }
}

/// Failures of the vector index client.
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    #[error("Vector index unreachable: {0}")]
    Unreachable(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector index rejected request: {message} (status: {status_code})")]
    Rejected { status_code: u16, message: String },

    #[error("Vector index not configured: {0}")]
    NotConfigured(String),
}

impl From<ProviderError> for IndexError {
    fn from(err: ProviderError) -> Self {
        IndexError::Embedding(err.to_string())
    }
}

/// Failures of the document ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode {format} document: {reason}")]
    Decode { format: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Batch {batch} of {total} failed after {attempts} attempts: {source}")]
    BatchFailed {
        batch: usize,
        total: usize,
        attempts: u32,
        #[source]
        source: IndexError,
    },
}

/// Failures of the conversation orchestrator itself.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("Tool loop exceeded {limit} iterations without a final answer")]
    ToolLoopExceeded { limit: usize },
}
