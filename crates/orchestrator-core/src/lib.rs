//! # orchestrator-core
//!
//! Agentic tool-calling orchestrator: turns a user request into a final answer
//! by repeatedly consulting a chat model, executing the tools it asks for and
//! feeding the results back until it answers or the iteration bound is hit.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Orchestrator                           │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────────┐  │
//! │  │   Ledger    │  │ ToolRegistry │  │  ChatModel          │  │
//! │  │  (history)  │──│ (per request)│──│  (model gateway)    │  │
//! │  └─────────────┘  └──────────────┘  └─────────────────────┘  │
//! │         │                │                                    │
//! │   MemoryStore       ToolSource                Guardrails      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The model transport, the tool source and the memory store are external
//! collaborators behind traits; [`TagCatalog`] and [`InMemoryStore`] are the
//! in-process implementations.

pub mod config;
pub mod error;
pub mod guardrail;
pub mod message;
pub mod orchestrator;
pub mod provider;
pub mod registry;
pub mod request;
pub mod session;
pub mod tool;

#[cfg(test)]
mod test_support;

pub use config::OrchestratorConfig;
pub use error::{AgentError, Result, ToolError};
pub use message::{Ledger, Message, Role};
pub use orchestrator::{OrchestrationResult, Orchestrator, OrchestratorBuilder, Termination};
pub use provider::{ChatModel, ChatResponse, FinishReason};
pub use registry::{TagCatalog, TagSelector, ToolRegistry, ToolSource};
pub use request::ConversationRequest;
pub use session::{InMemoryStore, MemoryStore, SessionId};
pub use tool::{ExecutionContext, ToolAction, ToolCallRequest, ToolExecutor, ToolSpecification};
