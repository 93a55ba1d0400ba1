//! Inbound conversation requests

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::message::{Ledger, Message, Role};
use crate::session::SessionId;

/// The body a caller submits: bare user text with optional system text, or a
/// pre-built message sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConversationRequest {
    Messages {
        messages: Vec<Message>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },
    Prompt {
        user_message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        system_message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },
}

impl ConversationRequest {
    /// Bare user text
    pub fn prompt(user_message: impl Into<String>) -> Self {
        Self::Prompt {
            user_message: user_message.into(),
            system_message: None,
            session_id: None,
        }
    }

    /// Pre-built ordered messages
    pub const fn from_messages(messages: Vec<Message>) -> Self {
        Self::Messages {
            messages,
            session_id: None,
        }
    }

    /// Attach system text. Ignored for message-sequence requests, which
    /// carry their own.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        if let Self::Prompt { system_message, .. } = &mut self {
            *system_message = Some(system.into());
        }
        self
    }

    #[must_use]
    pub fn with_session(mut self, id: impl Into<SessionId>) -> Self {
        match &mut self {
            Self::Messages { session_id, .. } | Self::Prompt { session_id, .. } => {
                *session_id = Some(id.into());
            }
        }
        self
    }

    /// Decode an untyped payload: a JSON string is bare user text, an object
    /// must be a well-formed request.
    pub fn from_payload(payload: Value) -> Result<Self> {
        match payload {
            Value::String(text) => Ok(Self::prompt(text)),
            Value::Object(_) => serde_json::from_value(payload)
                .map_err(|e| AgentError::InvalidPayload(e.to_string())),
            Value::Null => Err(AgentError::InvalidPayload("body is empty".into())),
            other => Err(AgentError::InvalidPayload(format!(
                "expected a string or a conversation request, got {other}"
            ))),
        }
    }

    pub const fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::Messages { session_id, .. } | Self::Prompt { session_id, .. } => {
                session_id.as_ref()
            }
        }
    }

    /// The most recent user text carried by this request itself, ignoring
    /// any stored history
    pub fn user_text(&self) -> Option<&str> {
        match self {
            Self::Prompt { user_message, .. } => Some(user_message.as_str()),
            Self::Messages { messages, .. } => messages
                .iter()
                .rev()
                .find(|m| m.role() == Role::User)
                .map(Message::content),
        }
    }

    /// Build the ledger for this request on top of stored `history`.
    ///
    /// `default_system` applies to prompt requests without their own system
    /// text. A system message from the request replaces the stored one.
    pub fn into_ledger(self, history: Ledger, default_system: Option<&str>) -> Result<Ledger> {
        let incoming = match self {
            Self::Prompt {
                user_message,
                system_message,
                ..
            } => {
                if user_message.trim().is_empty() {
                    return Err(AgentError::InvalidPayload("user message is blank".into()));
                }
                let system = system_message.as_deref().or(default_system);
                Ledger::from_prompt(&user_message, system).into_messages()
            }
            Self::Messages { messages, .. } => {
                if messages.is_empty() {
                    return Err(AgentError::InvalidPayload("message list is empty".into()));
                }
                messages
            }
        };

        let mut ledger = history;
        let mut incoming = incoming.into_iter().peekable();
        if let Some(system) = incoming.next_if(|m| m.role() == Role::System) {
            ledger.set_system(system.content());
        }
        for message in incoming {
            ledger.append(message)?;
        }
        Ok(ledger)
    }
}

impl From<&str> for ConversationRequest {
    fn from(text: &str) -> Self {
        Self::prompt(text)
    }
}

impl From<String> for ConversationRequest {
    fn from(text: String) -> Self {
        Self::prompt(text)
    }
}
