//! HTTP API gateway for Capstone.
//!
//! Exposes chat, document upload, health, tool listing and thread
//! inspection over REST. Built on Axum.

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Router,
    routing::{get, post},
};
use capstone_agent::{Orchestrator, ThreadStore};
use capstone_config::{AppConfig, GatewayConfig};
use capstone_core::event::{DomainEvent, EventBus};
use capstone_ingest::IngestionPipeline;
use capstone_providers::ModelGateway;
use capstone_tools::ToolContext;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, info, warn};

/// Shared application state for the gateway.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub pipeline: Arc<IngestionPipeline>,
    pub event_bus: Arc<EventBus>,
    /// Parent for per-upload staging directories; the system temp dir when unset.
    pub upload_dir: Option<PathBuf>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, pipeline: Arc<IngestionPipeline>, event_bus: Arc<EventBus>) -> Self {
        Self {
            orchestrator,
            pipeline,
            event_bus,
            upload_dir: None,
        }
    }

    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(dir.into());
        self
    }

    /// Assemble provider, index, tools, orchestrator and pipeline from config.
    ///
    /// Everything is built once and shared through `Arc`s. A missing model
    /// API key is not an error here; it surfaces on the first model call.
    pub async fn from_config(config: &AppConfig) -> capstone_core::Result<Self> {
        let event_bus = Arc::new(EventBus::default());

        let router = capstone_providers::build_from_config(config);
        let gateway = ModelGateway::from_config(config, &router)?;
        let index = capstone_index::build_from_config(config, gateway.provider().clone()).await?;
        info!(
            provider = %config.default_provider,
            model = %config.default_model,
            index = index.name(),
            "Runtime assembled"
        );

        let tools = Arc::new(capstone_tools::default_registry(ToolContext {
            index: index.clone(),
            gateway: gateway.clone(),
            config: config.tools.clone(),
            top_k: config.index.top_k,
        }));

        let orchestrator = Orchestrator::from_config(
            &config.agent,
            gateway,
            tools,
            Arc::new(ThreadStore::new()),
            event_bus.clone(),
        );
        let pipeline = IngestionPipeline::from_config(&config.ingestion, index).with_event_bus(event_bus.clone());

        Ok(Self::new(Arc::new(orchestrator), Arc::new(pipeline), event_bus))
    }
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    Router::new()
        .route("/health", get(api::health_handler))
        .route("/chat", post(api::chat_handler))
        .route("/upload", post(api::upload_handler))
        .route("/tools", get(api::list_tools_handler))
        .route("/threads/{id}", get(api::get_thread_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Any origin when none are configured, otherwise exactly the listed ones.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Log domain events until the bus is dropped.
pub fn spawn_event_logger(bus: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &DomainEvent) {
    match event {
        DomainEvent::ToolExecuted { thread_id, tool_name, success, duration_ms, .. } => {
            debug!(%thread_id, tool = %tool_name, success, duration_ms, "event: tool executed");
        }
        DomainEvent::TurnCompleted { thread_id, iterations, tool_calls, .. } => {
            debug!(%thread_id, iterations, tool_calls, "event: turn completed");
        }
        DomainEvent::DocumentIngested { document_id, filename, chunks, .. } => {
            info!(%document_id, %filename, chunks, "event: document ingested");
        }
        DomainEvent::BatchRetried { document_id, batch, error_message, .. } => {
            warn!(%document_id, batch, error = %error_message, "event: batch retried");
        }
        DomainEvent::ErrorOccurred { context, error_message, .. } => {
            warn!(%context, error = %error_message, "event: error");
        }
        other => debug!(event = ?other, "event"),
    }
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = Arc::new(AppState::from_config(&config).await?);
    let _event_logger = spawn_event_logger(&state.event_bus);
    let app = build_router(state, &config.gateway);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
