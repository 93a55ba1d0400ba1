//! Model Gateway
//!
//! Defines the single-call interface to a remote chat model. Implementations
//! own the transport (HTTP client, retries, timeouts); the orchestrator only
//! ever sees [`ChatModel::chat`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use orchestrator_core::provider::ChatModel;
//!
//! let response = model.chat(ledger.snapshot(), Some(&registry.specifications())).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::tool::{ToolCallRequest, ToolSpecification};

/// Response from one model call
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The generated text (may be empty when only tools were requested)
    #[serde(default)]
    pub text: String,

    /// Tool calls requested by the model, in emission order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,

    /// Finish reason reported by the transport
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,

    /// Token usage statistics (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl ChatResponse {
    /// A plain text answer finishing with [`FinishReason::Stop`]
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: Some(FinishReason::Stop),
            ..Self::default()
        }
    }

    /// A response requesting tools
    pub fn with_tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            tool_calls,
            finish_reason: Some(FinishReason::ToolUse),
            ..Self::default()
        }
    }

    /// Whether the model signalled it is done
    pub fn is_stop(&self) -> bool {
        self.finish_reason == Some(FinishReason::Stop)
    }
}

/// Token usage statistics
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolUse,
    ContentFilter,
    Error,
}

/// Strategy trait for model backends
///
/// Stateless per call: implementations neither read nor mutate the ledger
/// beyond the snapshot they are handed.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str {
        "chat-model"
    }

    /// Send the ordered messages, optionally advertising tools.
    ///
    /// Transport failures are returned as
    /// [`AgentError::ModelTransport`](crate::AgentError::ModelTransport) and
    /// are fatal to the request. Retry and rate-limit handling belong to the
    /// transport; the orchestrator makes each call once.
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolSpecification]>,
    ) -> Result<ChatResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_constructors() {
        let answer = ChatResponse::answer("done");
        assert!(answer.is_stop());
        assert!(answer.tool_calls.is_empty());

        let calls = ChatResponse::with_tool_calls(vec![ToolCallRequest::new("c1", "echo", None)]);
        assert!(!calls.is_stop());
        assert_eq!(calls.finish_reason, Some(FinishReason::ToolUse));
    }

    #[test]
    fn test_finish_reason_serde() {
        let json = serde_json::to_string(&FinishReason::ToolUse).unwrap();
        assert_eq!(json, "\"tool_use\"");
    }
}
