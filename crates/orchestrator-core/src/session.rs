//! Session Memory
//!
//! Key-scoped ledger persistence. When a [`MemoryStore`] is configured, the
//! orchestrator loads the ledger for the request's [`SessionId`] before the
//! loop and saves it afterwards. Eviction policy belongs to the store.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::message::{Ledger, Message, Role};

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Session store trait for persistence
///
/// Implementations provide their own concurrency safety and report backend
/// failures as [`AgentError::Session`](crate::AgentError::Session).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Load the ledger for a session; unknown sessions yield an empty ledger
    async fn load(&self, id: &SessionId) -> Result<Ledger>;

    /// Persist the ledger for a session, replacing what was stored
    async fn save(&self, id: &SessionId, ledger: &Ledger) -> Result<()>;

    /// Forget a session
    async fn delete(&self, id: &SessionId) -> Result<()>;
}

/// Listing entry for a stored session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
struct StoredSession {
    ledger: Ledger,
    updated_at: DateTime<Utc>,
}

/// In-memory session store, optionally bounded to a message window
#[derive(Default)]
pub struct InMemoryStore {
    sessions: RwLock<HashMap<SessionId, StoredSession>>,
    max_messages: Option<usize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_messages` per session, system message included.
    pub fn with_window(max_messages: usize) -> Self {
        Self {
            sessions: RwLock::default(),
            max_messages: Some(max_messages.max(1)),
        }
    }

    /// Sessions ordered by most recent activity
    pub async fn list(&self, limit: usize) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let mut result: Vec<_> = sessions
            .iter()
            .map(|(id, stored)| SessionSummary {
                id: id.clone(),
                message_count: stored.ledger.len(),
                updated_at: stored.updated_at,
            })
            .collect();

        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result.truncate(limit);
        result
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn load(&self, id: &SessionId) -> Result<Ledger> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(id)
            .map(|stored| stored.ledger.clone())
            .unwrap_or_default())
    }

    async fn save(&self, id: &SessionId, ledger: &Ledger) -> Result<()> {
        let ledger = match self.max_messages {
            Some(max) => Ledger::from_messages(apply_window(ledger.snapshot(), max))?,
            None => ledger.clone(),
        };

        tracing::debug!(session = %id, messages = ledger.len(), "Saving session");
        self.sessions.write().await.insert(
            id.clone(),
            StoredSession {
                ledger,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        self.sessions.write().await.remove(id);
        Ok(())
    }
}

/// Trim to the most recent `max` messages, keeping a leading system message
/// and dropping tool results whose assistant call fell out of the window.
fn apply_window(messages: &[Message], max: usize) -> Vec<Message> {
    let (system, rest) = match messages.split_first() {
        Some((first, rest)) if first.role() == Role::System => (Some(first), rest),
        _ => (None, messages),
    };

    let budget = max.saturating_sub(usize::from(system.is_some()));
    let start = rest.len().saturating_sub(budget);

    let mut issued = HashSet::new();
    let kept = rest[start..].iter().filter(|&message| match message {
        Message::Assistant { tool_calls, .. } => {
            issued.extend(tool_calls.iter().map(|call| call.id.as_str()));
            true
        }
        Message::Tool { tool_call_id, .. } => issued.contains(tool_call_id.as_str()),
        _ => true,
    });

    system.into_iter().chain(kept).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolCallRequest;

    fn chatty_ledger() -> Ledger {
        let mut ledger = Ledger::from_prompt("first", Some("system"));
        ledger.append(Message::assistant("reply one")).unwrap();
        ledger
            .append(Message::assistant_with_tool_calls(
                "",
                vec![ToolCallRequest::new("c1", "echo", None)],
            ))
            .unwrap();
        ledger.append(Message::tool_result("c1", "echo", "echoed")).unwrap();
        ledger.append(Message::assistant("reply two")).unwrap();
        ledger
    }

    #[tokio::test]
    async fn test_unknown_session_is_empty() {
        let store = InMemoryStore::new();
        let ledger = store.load(&SessionId::from("missing")).await.unwrap();
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = InMemoryStore::new();
        let id = SessionId::new();
        let ledger = chatty_ledger();

        store.save(&id, &ledger).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), ledger);

        store.delete(&id).await.unwrap();
        assert!(store.load(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = InMemoryStore::new();
        store
            .save(&SessionId::from("a"), &Ledger::from_prompt("for a", None))
            .await
            .unwrap();

        assert!(store.load(&SessionId::from("b")).await.unwrap().is_empty());
        assert_eq!(store.list(10).await.len(), 1);
    }

    #[tokio::test]
    async fn test_window_keeps_system_and_drops_orphans() {
        let store = InMemoryStore::with_window(3);
        let id = SessionId::from("windowed");
        store.save(&id, &chatty_ledger()).await.unwrap();

        // Last two non-system messages are the tool result and "reply two";
        // the tool result lost its call, so only the reply survives.
        let loaded = store.load(&id).await.unwrap();
        assert_eq!(
            loaded.into_messages(),
            vec![Message::system("system"), Message::assistant("reply two")]
        );
    }

    #[tokio::test]
    async fn test_window_drops_result_whose_call_was_evicted_mid_range() {
        let mut ledger = Ledger::from_prompt("look it up", None);
        ledger
            .append(Message::assistant_with_tool_calls(
                "",
                vec![ToolCallRequest::new("c1", "lookup", None)],
            ))
            .unwrap();
        ledger.append(Message::user("still there?")).unwrap();
        ledger.append(Message::tool_result("c1", "lookup", "found")).unwrap();

        let store = InMemoryStore::with_window(2);
        let id = SessionId::from("interleaved");
        store.save(&id, &ledger).await.unwrap();

        assert_eq!(
            store.load(&id).await.unwrap().into_messages(),
            vec![Message::user("still there?")]
        );
    }

    #[test]
    fn test_window_keeps_result_when_call_survives() {
        let messages = vec![
            Message::user("one"),
            Message::assistant_with_tool_calls("", vec![ToolCallRequest::new("c1", "echo", None)]),
            Message::user("two"),
            Message::tool_result("c1", "echo", "echoed"),
        ];
        assert_eq!(apply_window(&messages, 3), messages[1..].to_vec());
    }

    #[test]
    fn test_window_without_system() {
        let messages = vec![
            Message::user("one"),
            Message::assistant("two"),
            Message::user("three"),
        ];
        assert_eq!(
            apply_window(&messages, 2),
            vec![Message::assistant("two"), Message::user("three")]
        );
    }
}
