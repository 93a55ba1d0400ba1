//! Shared test helpers.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{ChatModel, ChatResponse};
use crate::tool::{ToolCallRequest, ToolSpecification};

/// One recorded gateway call
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools: Option<Vec<ToolSpecification>>,
}

/// A model that replays scripted responses in order.
///
/// Once the script runs out it repeats `fallback`, or fails with a transport
/// error when there is none.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<ChatResponse>>>,
    fallback: Option<ChatResponse>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `response`
    pub fn repeating(response: ChatResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::new(Vec::new())
        }
    }

    /// Fail the first call with a transport error carrying `reason`; later calls
    /// fail with "script exhausted"
    pub fn failing(reason: &str) -> Self {
        let model = Self::new(Vec::new());
        model
            .script
            .lock()
            .unwrap()
            .push_back(Err(AgentError::ModelTransport(reason.into())));
        model
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolSpecification]>,
    ) -> Result<ChatResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            tools: tools.map(<[ToolSpecification]>::to_vec),
        });

        let next = self.script.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(response), _) => response,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(AgentError::ModelTransport("script exhausted".into())),
        }
    }
}

/// Shorthand for a tool call with JSON arguments
pub fn call(id: &str, name: &str, arguments: &str) -> ToolCallRequest {
    ToolCallRequest::new(id, name, Some(arguments.to_string()))
}
