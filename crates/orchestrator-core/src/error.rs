//! Error Types

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Fatal errors that abort a request.
///
/// Tool-level failures are not represented here; see [`ToolError`].
#[derive(Error, Debug)]
pub enum AgentError {
    /// The model gateway call failed
    #[error("Model transport error: {0}")]
    ModelTransport(String),

    /// A memory store is configured but the request carried no session id
    #[error("A session id is required when a memory store is configured")]
    MissingSessionId,

    /// Inbound payload is neither a bare string nor a conversation request
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// A guardrail rejected the input or the output
    #[error("{stage} guardrail rejected the request: {reason}")]
    Guardrail {
        stage: GuardrailStage,
        reason: String,
    },

    /// A tool result referenced a call id no assistant message issued
    #[error("Tool result references unknown tool call id: {0}")]
    UncorrelatedToolResult(String),

    /// Memory store backend failure, reported by [`MemoryStore`](crate::MemoryStore)
    /// implementations
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which side of the model call a guardrail guards
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardrailStage {
    Input,
    Output,
}

impl std::fmt::Display for GuardrailStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "Input"),
            Self::Output => write!(f, "Output"),
        }
    }
}

impl AgentError {
    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::ModelTransport(msg) => format!("The AI service encountered an error: {msg}"),
            Self::MissingSessionId => "This conversation requires a session id.".into(),
            Self::InvalidPayload(msg) => format!("The request could not be understood: {msg}"),
            Self::Guardrail { reason, .. } => format!("The request was blocked: {reason}"),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

/// Tool-level failures, recovered inside the orchestration loop.
///
/// None of these abort a request: argument and execution failures become
/// tool result text for the model, unresolved tools are logged and skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Tool arguments were not a JSON object
    #[error("Invalid arguments for tool '{tool}': {reason}")]
    ArgumentParse { tool: String, reason: String },

    /// The model named a tool absent from the registry
    #[error("Tool not found: {0}")]
    Unresolved(String),

    /// The wrapped action failed
    #[error("Error executing tool '{tool}': {reason}")]
    Execution { tool: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        assert_eq!(
            AgentError::ModelTransport("502".into()).user_message(),
            "The AI service encountered an error: 502"
        );
        assert_eq!(
            AgentError::Config("bad".into()).user_message(),
            "An unexpected error occurred."
        );
    }

    #[test]
    fn test_execution_error_text() {
        let err = ToolError::Execution {
            tool: "get_weather".into(),
            reason: "timeout".into(),
        };
        assert_eq!(err.to_string(), "Error executing tool 'get_weather': timeout");
    }

    #[test]
    fn test_guardrail_display() {
        let err = AgentError::Guardrail {
            stage: GuardrailStage::Input,
            reason: "profanity".into(),
        };
        assert_eq!(err.to_string(), "Input guardrail rejected the request: profanity");
    }
}
