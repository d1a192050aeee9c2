//! End-to-end tests for the Capstone agent.
//!
//! These drive the HTTP router over a fully wired runtime: the real tool
//! registry, orchestrator, thread store, ingestion pipeline and in-process
//! index, with only the model provider scripted.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use capstone_agent::{Orchestrator, ThreadStore};
use capstone_config::{GatewayConfig, ToolsConfig};
use capstone_core::document::{DocumentChunk, ScoredChunk};
use capstone_core::error::{IndexError, ProviderError};
use capstone_core::event::{DomainEvent, EventBus};
use capstone_core::index::VectorIndex;
use capstone_core::message::{Message, MessageToolCall, Role, ThreadId};
use capstone_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
use capstone_gateway::{AppState, build_router};
use capstone_index::{Embedder, InMemoryIndex};
use capstone_ingest::{BatchPolicy, IngestionPipeline, RecursiveSplitter};
use capstone_providers::ModelGateway;
use capstone_tools::{ToolContext, default_registry};
use http_body_util::BodyExt;
use tower::ServiceExt;

// ── Mock Provider ────────────────────────────────────────────────────────

/// Returns scripted chat responses in sequence and embeds text as letter
/// frequencies, recording every chat request it receives.
struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            panic!("ScriptedProvider exhausted");
        }
        Ok(responses.remove(0))
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let embeddings = request
            .inputs
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; 26];
                for b in text.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
                    v[(b - b'a') as usize] += 1.0;
                }
                v
            })
            .collect();
        Ok(EmbeddingResponse {
            embeddings,
            model: request.model,
            usage: None,
        })
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock".into(),
    }
}

fn tool_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tools("", tool_calls),
        usage: None,
        model: "mock".into(),
    }
}

fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// Counts upsert calls and the chunks in each.
#[derive(Default)]
struct RecordingIndex {
    batches: Mutex<Vec<usize>>,
}

#[async_trait::async_trait]
impl VectorIndex for RecordingIndex {
    fn name(&self) -> &str {
        "recording"
    }

    async fn upsert(&self, chunks: &[DocumentChunk]) -> Result<usize, IndexError> {
        self.batches.lock().unwrap().push(chunks.len());
        Ok(chunks.len())
    }

    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        Ok(Vec::new())
    }
}

// ── Runtime wiring ───────────────────────────────────────────────────────

struct Runtime {
    app: axum::Router,
    state: Arc<AppState>,
}

fn runtime(provider: Arc<ScriptedProvider>, index: Arc<dyn VectorIndex>) -> Runtime {
    let event_bus = Arc::new(EventBus::default());
    let gateway = ModelGateway::new(provider, "mock");
    let tools = Arc::new(default_registry(ToolContext {
        index: index.clone(),
        gateway: gateway.clone(),
        config: ToolsConfig::default(),
        top_k: 3,
    }));
    let orchestrator = Orchestrator::new(gateway, tools, Arc::new(ThreadStore::new()), event_bus.clone());
    let policy = BatchPolicy {
        batch_size: 5,
        retry_cooldown: Duration::ZERO,
        batch_cooldown: Duration::ZERO,
    };
    let pipeline =
        IngestionPipeline::new(index, RecursiveSplitter::new(50, 0), policy).with_event_bus(event_bus.clone());

    let state = Arc::new(AppState::new(Arc::new(orchestrator), Arc::new(pipeline), event_bus));
    Runtime {
        app: build_router(state.clone(), &GatewayConfig::default()),
        state,
    }
}

fn memory_index(provider: &Arc<ScriptedProvider>) -> Arc<dyn VectorIndex> {
    Arc::new(InMemoryIndex::new(Embedder::new(provider.clone(), "letters")))
}

async fn chat(app: &axum::Router, thread_id: &str, message: &str) -> serde_json::Value {
    let request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({"message": message, "thread_id": thread_id}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn upload(app: &axum::Router, filename: &str, content: &[u8]) -> (StatusCode, serde_json::Value) {
    let boundary = "e2e-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ── E2E: Conversation ────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_demo_chart_is_attached_to_answer() {
    let provider = ScriptedProvider::new(vec![
        tool_response(vec![make_tool_call("visualization_demo", serde_json::json!({}))]),
        text_response("Here is a line chart of quarterly revenue."),
    ]);
    let rt = runtime(provider.clone(), memory_index(&provider));

    let body = chat(&rt.app, "demo", "Demo me a line chart.").await;
    let response = body["response"].as_str().unwrap();

    let fenced = format!("```json\n{}\n```", capstone_tools::visualization_demo::SAMPLE_CHART);
    assert!(response.starts_with("Here is a line chart of quarterly revenue."));
    assert!(response.contains(&fenced), "missing chart block in: {response}");
    assert_eq!(response.matches("```json").count(), 1);
    assert_eq!(body["tool_call_count"], 1);

    // The second model call saw the chart as a tool message.
    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    let tool_msg = requests[1].messages.last().unwrap();
    assert_eq!(tool_msg.role, Role::Tool);
    assert_eq!(tool_msg.content, capstone_tools::visualization_demo::SAMPLE_CHART);
}

#[tokio::test]
async fn e2e_calculator_answer() {
    let provider = ScriptedProvider::new(vec![
        tool_response(vec![make_tool_call("calculator", serde_json::json!({"expression": "2+2"}))]),
        text_response("2 + 2 = 4"),
    ]);
    let rt = runtime(provider.clone(), memory_index(&provider));

    let body = chat(&rt.app, "math", "What's 2+2?").await;
    assert!(body["response"].as_str().unwrap().contains('4'));

    let thread = rt
        .state
        .orchestrator
        .threads()
        .snapshot(&ThreadId::from("math"))
        .await
        .unwrap();
    let roles: Vec<Role> = thread.messages().iter().map(|m| m.role.clone()).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
    assert_eq!(thread.messages()[2].content, "4");
    assert!(thread.tool_pairing_holds());
}

#[tokio::test]
async fn e2e_thread_history_is_reused() {
    let provider = ScriptedProvider::new(vec![
        text_response("Nice to meet you, Ada."),
        text_response("Your name is Ada."),
    ]);
    let rt = runtime(provider.clone(), memory_index(&provider));

    chat(&rt.app, "t1", "My name is Ada.").await;
    let body = chat(&rt.app, "t1", "What is my name?").await;
    assert_eq!(body["response"], "Your name is Ada.");
    assert_eq!(body["thread_id"], "t1");

    let second = &provider.requests()[1];
    let contents: Vec<&str> = second.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(second.messages[0].role, Role::System);
    assert_eq!(
        &contents[1..],
        &["My name is Ada.", "Nice to meet you, Ada.", "What is my name?"]
    );
}

#[tokio::test]
async fn e2e_failing_tool_does_not_end_turn() {
    let provider = ScriptedProvider::new(vec![
        tool_response(vec![make_tool_call("calculator", serde_json::json!({"expression": "1/0"}))]),
        text_response("That division is undefined."),
    ]);
    let rt = runtime(provider.clone(), memory_index(&provider));

    let body = chat(&rt.app, "err", "What is 1/0?").await;
    assert_eq!(body["response"], "That division is undefined.");

    let tool_msg = provider.requests()[1].messages.last().unwrap().clone();
    assert!(tool_msg.content.starts_with("Error:"), "got: {}", tool_msg.content);
}

// ── E2E: Ingestion and retrieval ─────────────────────────────────────────

#[tokio::test]
async fn e2e_uploaded_document_is_searchable() {
    let provider = ScriptedProvider::new(vec![
        tool_response(vec![make_tool_call(
            "search_documents",
            serde_json::json!({"query": "quarterly revenue"}),
        )]),
        text_response("The document discusses quarterly revenue."),
    ]);
    let rt = runtime(provider.clone(), memory_index(&provider));

    let (status, body) = upload(&rt.app, "report.txt", b"Quarterly revenue grew in Q4.").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    chat(&rt.app, "rag", "What does the document say about revenue?").await;

    let tool_msg = provider.requests()[1].messages.last().unwrap().clone();
    assert_eq!(tool_msg.content, "[Passage 1]: Quarterly revenue grew in Q4....");
}

#[tokio::test]
async fn e2e_ingestion_batches_by_five() {
    let provider = ScriptedProvider::new(vec![]);
    let index = Arc::new(RecordingIndex::default());
    let rt = runtime(provider, index.clone());
    let mut events = rt.state.event_bus.subscribe();

    // Twelve paragraphs, each too long to share a 50-char chunk with another.
    let text: Vec<String> = (1..=12)
        .map(|i| format!("Paragraph {i:02} covers quarterly revenue."))
        .collect();
    let (status, body) = upload(&rt.app, "notes.txt", text.join("\n\n").as_bytes()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["info"],
        "File processed successfully. Added 12 chunks to knowledge base."
    );
    assert_eq!(*index.batches.lock().unwrap(), vec![5, 5, 2]);

    let mut upserted = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event.as_ref(), DomainEvent::BatchUpserted { .. }) {
            upserted += 1;
        }
    }
    assert_eq!(upserted, 3);
}

#[tokio::test]
async fn e2e_csv_upload_is_rejected() {
    let provider = ScriptedProvider::new(vec![]);
    let index = Arc::new(RecordingIndex::default());
    let rt = runtime(provider, index.clone());

    let (status, body) = upload(&rt.app, "data.csv", b"a,b\n1,2\n").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains(".csv"));
    assert!(index.batches.lock().unwrap().is_empty());
}
