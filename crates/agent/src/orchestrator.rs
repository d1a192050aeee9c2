//! The conversation orchestrator state machine.

use crate::response::compose_response;
use crate::thread_store::ThreadStore;
use capstone_config::AgentConfig;
use capstone_core::error::{AgentError, Result};
use capstone_core::event::{DomainEvent, EventBus};
use capstone_core::message::{Message, MessageToolCall, ThreadId};
use capstone_core::tool::ToolRegistry;
use capstone_providers::ModelGateway;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The result of one completed turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub thread_id: ThreadId,
    /// Final answer, with any chart payload attached
    pub response: String,
    /// Tool dispatch rounds taken
    pub iterations: usize,
    /// Tool calls executed across all rounds
    pub tool_calls: usize,
}

enum TurnState {
    AwaitModel,
    DispatchTools(Vec<MessageToolCall>),
    Done,
}

/// Drives a turn: model call, tool dispatch, repeat until a text answer.
pub struct Orchestrator {
    gateway: ModelGateway,
    tools: Arc<ToolRegistry>,
    threads: Arc<ThreadStore>,
    event_bus: Arc<EventBus>,
    system_prompt: String,
    max_tool_iterations: usize,
}

impl Orchestrator {
    pub fn new(
        gateway: ModelGateway,
        tools: Arc<ToolRegistry>,
        threads: Arc<ThreadStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let system_prompt = default_system_prompt(&tools);
        Self {
            gateway,
            tools,
            threads,
            event_bus,
            system_prompt,
            max_tool_iterations: 10,
        }
    }

    pub fn from_config(
        config: &AgentConfig,
        gateway: ModelGateway,
        tools: Arc<ToolRegistry>,
        threads: Arc<ThreadStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let orchestrator = Self::new(gateway, tools, threads, event_bus)
            .with_max_tool_iterations(config.max_tool_iterations);
        match &config.system_prompt {
            Some(prompt) => orchestrator.with_system_prompt(prompt),
            None => orchestrator,
        }
    }

    /// Maximum tool dispatch rounds per turn.
    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn threads(&self) -> &Arc<ThreadStore> {
        &self.threads
    }

    /// Run one turn for `text` on `thread_id`.
    ///
    /// The thread is held exclusively for the whole turn. Messages are
    /// appended as they are produced, so a failed turn keeps what it added.
    /// A model or gateway failure ends the turn with an error; a tool
    /// failure never does.
    pub async fn run_turn(&self, thread_id: &ThreadId, text: &str) -> Result<TurnOutcome> {
        let mut thread = self.threads.acquire(thread_id).await;
        let turn_start = thread.len();
        thread.push(Message::user(text));

        info!(thread_id = %thread_id, history = thread.len(), "Processing turn");

        let definitions = self.tools.definitions();
        let mut state = TurnState::AwaitModel;
        let mut iterations = 0usize;
        let mut tool_calls = 0usize;

        loop {
            state = match state {
                TurnState::AwaitModel => {
                    debug!(thread_id = %thread_id, iteration = iterations, "Calling model");

                    let response = match self
                        .gateway
                        .invoke(&self.system_prompt, thread.messages(), definitions.clone())
                        .await
                    {
                        Ok(response) => response,
                        Err(e) => {
                            self.publish_error(thread_id, &e);
                            return Err(e.into());
                        }
                    };

                    if let Some(usage) = &response.usage {
                        self.event_bus.publish(DomainEvent::ResponseGenerated {
                            thread_id: thread_id.to_string(),
                            model: response.model.clone(),
                            tokens_used: usage.total_tokens,
                            timestamp: Utc::now(),
                        });
                    }

                    let message = response.message;
                    if !message.has_tool_calls() {
                        thread.push(message);
                        TurnState::Done
                    } else if iterations >= self.max_tool_iterations {
                        // Not appended: its calls would never get results.
                        warn!(
                            thread_id = %thread_id,
                            limit = self.max_tool_iterations,
                            "Tool loop limit reached"
                        );
                        let err = AgentError::ToolLoopExceeded {
                            limit: self.max_tool_iterations,
                        };
                        self.publish_error(thread_id, &err);
                        return Err(err.into());
                    } else {
                        let calls = message.tool_calls.clone();
                        thread.push(message);
                        TurnState::DispatchTools(calls)
                    }
                }

                TurnState::DispatchTools(calls) => {
                    iterations += 1;
                    debug!(thread_id = %thread_id, count = calls.len(), "Executing tool calls");

                    for call in &calls {
                        let start = std::time::Instant::now();
                        let result = self.tools.dispatch(call).await;
                        let duration_ms = start.elapsed().as_millis() as u64;

                        self.event_bus.publish(DomainEvent::ToolExecuted {
                            thread_id: thread_id.to_string(),
                            tool_name: call.name.clone(),
                            success: result.success,
                            duration_ms,
                            timestamp: Utc::now(),
                        });
                        debug!(tool = %call.name, success = result.success, duration_ms, "Tool finished");

                        thread.push(Message::tool_result(&call.id, result.output));
                    }
                    tool_calls += calls.len();
                    TurnState::AwaitModel
                }

                TurnState::Done => break,
            };
        }

        let response = compose_response(&thread.messages()[turn_start..]);

        self.event_bus.publish(DomainEvent::TurnCompleted {
            thread_id: thread_id.to_string(),
            iterations,
            tool_calls,
            timestamp: Utc::now(),
        });
        info!(thread_id = %thread_id, iterations, tool_calls, "Turn completed");

        Ok(TurnOutcome {
            thread_id: thread_id.clone(),
            response,
            iterations,
            tool_calls,
        })
    }

    fn publish_error(&self, thread_id: &ThreadId, error: &dyn std::error::Error) {
        self.event_bus.publish(DomainEvent::ErrorOccurred {
            context: format!("turn on thread {thread_id}"),
            error_message: error.to_string(),
            timestamp: Utc::now(),
        });
    }
}

/// Capability usage policy sent ahead of every model call.
pub fn default_system_prompt(tools: &ToolRegistry) -> String {
    let mut prompt = String::from(
        "You are a helpful AI assistant with access to various capability tools.\n\nTools available:\n",
    );
    for def in tools.definitions() {
        prompt.push_str(&format!("- {}: {}\n", def.name, def.description));
    }
    prompt.push_str(
        "\nWhen the user asks for a chart or graph, ALWAYS use the `generate_chart` tool.\n\
         When the user asks about the document, use `search_documents`.",
    );
    prompt
}
