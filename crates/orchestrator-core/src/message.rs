//! Conversation Messages
//!
//! The message union exchanged with the model gateway, and the [`Ledger`]
//! that holds one orchestration run's ordered history.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::tool::ToolCallRequest;

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result fed back to the model
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    /// Model output, including any tool calls it requested
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    /// Result of one tool call, correlated by the call's id
    Tool {
        tool_call_id: String,
        tool_name: String,
        content: String,
    },
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::System { content: content.into() }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::User { content: content.into() }
    }

    /// Create an assistant message without tool calls
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant message carrying tool-call requests
    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCallRequest>,
    ) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    /// Create a tool result message
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
        }
    }

    pub const fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::Tool { .. } => Role::Tool,
        }
    }

    /// Text payload, whatever the role
    pub fn content(&self) -> &str {
        match self {
            Self::System { content }
            | Self::User { content }
            | Self::Assistant { content, .. }
            | Self::Tool { content, .. } => content,
        }
    }

    /// Tool calls issued by this message (empty unless assistant)
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

/// Ordered conversation history for one orchestration run.
///
/// Append-only: a tool result is accepted only if an earlier assistant
/// message in the same ledger issued its call id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Message>", into = "Vec<Message>")]
pub struct Ledger {
    messages: Vec<Message>,
    issued_calls: HashSet<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from bare user text.
    ///
    /// The system message, when present and not blank, always comes first.
    /// Blank user text is skipped.
    pub fn from_prompt(user: &str, system: Option<&str>) -> Self {
        let mut ledger = Self::new();
        if let Some(system) = system.filter(|s| !s.trim().is_empty()) {
            ledger.messages.push(Message::system(system));
        }
        if !user.trim().is_empty() {
            ledger.messages.push(Message::user(user));
        }
        ledger
    }

    /// Build a ledger from a pre-built message sequence, checking tool-result
    /// correlation along the way.
    pub fn from_messages(messages: impl IntoIterator<Item = Message>) -> Result<Self> {
        let mut ledger = Self::new();
        for message in messages {
            ledger.append(message)?;
        }
        Ok(ledger)
    }

    /// Append a message
    pub fn append(&mut self, message: Message) -> Result<()> {
        match &message {
            Message::Assistant { tool_calls, .. } => {
                self.issued_calls
                    .extend(tool_calls.iter().map(|call| call.id.clone()));
            }
            Message::Tool { tool_call_id, .. } if !self.issued_calls.contains(tool_call_id) => {
                return Err(AgentError::UncorrelatedToolResult(tool_call_id.clone()));
            }
            _ => {}
        }
        self.messages.push(message);
        Ok(())
    }

    /// Immutable ordered view for the model gateway
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Replace (or insert) the leading system message.
    ///
    /// Only used while assembling a ledger from stored history, before a run
    /// starts.
    pub(crate) fn set_system(&mut self, content: &str) {
        match self.messages.first_mut() {
            Some(Message::System { content: existing }) => content.clone_into(existing),
            _ => self.messages.insert(0, Message::system(content)),
        }
    }

    /// Content of the most recent user message
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role() == Role::User)
            .map(Message::content)
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl TryFrom<Vec<Message>> for Ledger {
    type Error = AgentError;

    fn try_from(messages: Vec<Message>) -> Result<Self> {
        Self::from_messages(messages)
    }
}

impl From<Ledger> for Vec<Message> {
    fn from(ledger: Ledger) -> Self {
        ledger.messages
    }
}
