//! The conversation orchestrator: the heart of Capstone.
//!
//! A turn follows an **await model → dispatch tools** cycle:
//!
//! 1. **Append** the user message to its thread
//! 2. **Call the model** with the system policy, the full history and the
//!    declared tools
//! 3. **If tool calls**: run each in order, append one `tool` message per
//!    call, loop back to step 2
//! 4. **If text only**: compose the final answer, attaching the turn's
//!    latest chart payload when the answer does not already carry it
//!
//! Turns on the same thread are serialized by the thread store; different
//! threads run in parallel.

pub mod orchestrator;
pub mod response;
pub mod thread_store;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use orchestrator::{Orchestrator, TurnOutcome, default_system_prompt};
pub use response::compose_response;
pub use thread_store::ThreadStore;
