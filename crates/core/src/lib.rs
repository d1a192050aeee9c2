//! # Capstone Core
//!
//! Domain types, traits, and error definitions for the Capstone agent.
//! This crate has **zero framework dependencies**: it defines the domain model
//! that all other crates implement against.
//!
//! ## Boundaries
//!
//! Every external collaborator is a trait here:
//! - [`Provider`]: the model gateway (chat completions + embeddings)
//! - [`Tool`]: a capability the model may invoke by name
//! - [`VectorIndex`]: embedding storage with similarity search
//!
//! Implementations live in their respective crates, so tests can swap in
//! scripted doubles without touching the orchestrator or the pipeline.

pub mod chart;
pub mod document;
pub mod error;
pub mod event;
pub mod index;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use chart::{ChartKind, ChartPayload, Dataset};
pub use document::{DocumentChunk, ScoredChunk, SourceDocument, SourceSection};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use index::VectorIndex;
pub use message::{ConversationThread, Message, MessageToolCall, Role, ThreadId};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
