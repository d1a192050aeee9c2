//! LLM Provider implementations for Capstone.
//!
//! All providers implement the `capstone_core::Provider` trait.
//! The router selects the correct provider based on configuration, and
//! [`ModelGateway`] binds it to a model for the rest of the system.

pub mod model_gateway;
pub mod openai_compat;
pub mod router;

pub use model_gateway::ModelGateway;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
