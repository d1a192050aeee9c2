//! Request handlers and wire types.
//!
//! - `GET  /health`: liveness
//! - `POST /chat`: run one turn on a thread
//! - `POST /upload`: ingest a `.pdf`, `.txt` or `.docx` file
//! - `GET  /tools`: list capability descriptors
//! - `GET  /threads/{id}`: a thread's message history

use crate::SharedState;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use capstone_core::error::{Error, IngestError};
use capstone_core::message::{ConversationThread, ThreadId};
use capstone_core::provider::ToolDefinition;
use capstone_ingest::DocumentFormat;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    message: String,
    #[serde(default)]
    thread_id: ThreadId,
}

#[derive(Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub thread_id: ThreadId,
    /// Number of tool invocations made while producing `response`.
    pub tool_call_count: usize,
}

#[derive(Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub status: String,
    pub info: String,
}

#[derive(Serialize)]
pub struct ToolListResponse {
    tools: Vec<ToolDefinition>,
    count: usize,
}

/// Client mistakes carry `message`, server faults carry `detail`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "message": message }))).into_response()
            }
            ApiError::NotFound(detail) => {
                (StatusCode::NOT_FOUND, Json(serde_json::json!({ "detail": detail }))).into_response()
            }
            ApiError::Internal(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "detail": detail })),
            )
                .into_response(),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UnsupportedFormat(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    info!(thread_id = %payload.thread_id, message_len = payload.message.len(), "Chat request");

    match state.orchestrator.run_turn(&payload.thread_id, &payload.message).await {
        Ok(outcome) => Ok(Json(ChatResponse {
            response: outcome.response,
            thread_id: outcome.thread_id,
            tool_call_count: outcome.tool_calls,
        })),
        Err(e) => {
            error!(thread_id = %payload.thread_id, error = %e, "Chat turn failed");
            Err(ApiError::Internal(turn_error_detail(&e)))
        }
    }
}

/// The innermost message, without the top-level category prefix.
fn turn_error_detail(err: &Error) -> String {
    match err {
        Error::Provider(e) => e.to_string(),
        Error::Agent(e) => e.to_string(),
        other => other.to_string(),
    }
}

pub async fn upload_handler(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Upload has no filename".into()))?;
        let staged_name = staged_file_name(&filename)?;
        // Rejected before the body is buffered.
        DocumentFormat::from_filename(&staged_name)?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?;
        upload = Some((filename, staged_name, bytes));
        break;
    }
    let (filename, staged_name, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".into()))?;
    info!(filename = %staged_name, bytes = bytes.len(), "Upload received");

    // The staging directory is removed when `staging` drops, on every path.
    let staging = staging_dir(state.upload_dir.as_deref())
        .map_err(|e| ApiError::Internal(format!("Failed to stage upload: {e}")))?;
    let path = staging.path().join(&staged_name);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to stage upload: {e}")))?;

    let chunks = state.pipeline.ingest_path(&path).await.map_err(|e| {
        error!(filename = %staged_name, error = %e, "Error processing file");
        ApiError::from(e)
    })?;

    Ok(Json(UploadResponse {
        filename,
        status: "success".into(),
        info: format!("File processed successfully. Added {chunks} chunks to knowledge base."),
    }))
}

/// Only the final path component is kept for the staged copy.
fn staged_file_name(filename: &str) -> Result<String, ApiError> {
    std::path::Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid filename '{filename}'")))
}

fn staging_dir(parent: Option<&std::path::Path>) -> std::io::Result<tempfile::TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("capstone-upload-");
    match parent {
        Some(dir) => builder.tempdir_in(dir),
        None => builder.tempdir(),
    }
}

pub async fn list_tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    let tools = state.orchestrator.tools().definitions();
    let count = tools.len();
    Json(ToolListResponse { tools, count })
}

pub async fn get_thread_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationThread>, ApiError> {
    state
        .orchestrator
        .threads()
        .snapshot(&ThreadId(id.clone()))
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Thread '{id}' not found")))
}
