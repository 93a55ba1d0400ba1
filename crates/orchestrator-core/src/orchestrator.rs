//! Orchestration Loop
//!
//! Drives a request to a final answer:
//!
//! ```text
//! AWAITING_MODEL ─▶ TOOLS_REQUESTED ─▶ TOOLS_EXECUTED ─┐
//!       ▲                                              │
//!       └──────────────────────────────────────────────┘
//!       │
//!       └──▶ DONE  (no tool calls, or a stop finish reason)
//! ```
//!
//! Every model gateway call counts against `max_iterations`, including the
//! final tool-less call made when the bound runs out, so a request never
//! exceeds that many calls and always ends with an answer. Tool problems are
//! recovered in place; only gateway, session, guardrail and payload errors
//! reach the caller.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::OrchestratorConfig;
use crate::error::{AgentError, Result};
use crate::guardrail::{Guardrails, InputGuardrail, OutputGuardrail};
use crate::message::{Ledger, Message};
use crate::provider::ChatModel;
use crate::registry::{ToolRegistry, ToolSource};
use crate::request::ConversationRequest;
use crate::session::MemoryStore;
use crate::tool::{ExecutionContext, ToolCallRequest};

/// How the loop ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The model produced a terminal answer
    Completed,
    /// The iteration bound was hit and the fallback call answered
    IterationLimit,
}

/// Outcome of one orchestration run
#[derive(Clone, Debug)]
pub struct OrchestrationResult {
    /// Final answer text
    pub text: String,

    /// Whether at least one tool executor was invoked
    pub tools_called: bool,

    /// Set when the registry was empty and the model was called directly
    pub no_tools_available: bool,

    pub termination: Termination,

    /// Number of model gateway calls made
    pub iterations: usize,

    /// Names the model asked for that the registry did not have, in order
    pub unresolved_tools: Vec<String>,

    /// The ledger as it stood when the run ended
    pub ledger: Ledger,
}

/// The orchestrator: model, tool source, optional memory and guardrails
pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    tool_source: Option<Arc<dyn ToolSource>>,
    memory: Option<Arc<dyn MemoryStore>>,
    guardrails: Guardrails,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Handle a caller request end to end.
    ///
    /// With a memory store configured the request must carry a session id;
    /// the stored ledger is loaded first and the final ledger saved after.
    pub async fn handle(
        &self,
        request: ConversationRequest,
        context: &mut ExecutionContext,
    ) -> Result<OrchestrationResult> {
        let session = match &self.memory {
            Some(memory) => {
                let id = request
                    .session_id()
                    .cloned()
                    .ok_or(AgentError::MissingSessionId)?;
                Some((memory, id))
            }
            None => None,
        };

        let history = match &session {
            Some((memory, id)) => {
                let history = memory.load(id).await?;
                debug!(session = %id, messages = history.len(), "Loaded session history");
                history
            }
            None => Ledger::new(),
        };

        let user_message = request.user_text().map(str::to_owned);
        let ledger = request.into_ledger(history, self.config.system_message.as_deref())?;
        if let Some(user_message) = &user_message {
            self.guardrails.check_input(user_message)?;
        }

        let registry = self.discover_tools().await?;
        let result = self.run(ledger, &registry, context).await?;
        self.guardrails.check_output(&result.text)?;

        if let Some((memory, id)) = &session {
            memory.save(id, &result.ledger).await?;
        }

        Ok(result)
    }

    /// Decode an untyped payload and handle it
    pub async fn handle_payload(
        &self,
        payload: serde_json::Value,
        context: &mut ExecutionContext,
    ) -> Result<OrchestrationResult> {
        let request = ConversationRequest::from_payload(payload)?;
        self.handle(request, context).await
    }

    /// Run with a simple string input and a throwaway execution context
    pub async fn ask(&self, question: &str) -> Result<String> {
        let mut context = ExecutionContext::new();
        let result = self.handle(ConversationRequest::prompt(question), &mut context).await?;
        Ok(result.text)
    }

    /// Build this request's registry from the configured source and tags
    pub async fn discover_tools(&self) -> Result<ToolRegistry> {
        match &self.tool_source {
            Some(source) => ToolRegistry::discover(source.as_ref(), &self.config.tag_selector()).await,
            None => Ok(ToolRegistry::new()),
        }
    }

    /// The loop itself, over a prepared ledger and registry
    pub async fn run(
        &self,
        mut ledger: Ledger,
        registry: &ToolRegistry,
        context: &mut ExecutionContext,
    ) -> Result<OrchestrationResult> {
        if registry.is_empty() {
            debug!(model = self.model.name(), "No tools available, calling model directly");
            let text = self.direct_call(&mut ledger).await?;
            return Ok(OrchestrationResult {
                text,
                tools_called: false,
                no_tools_available: true,
                termination: Termination::Completed,
                iterations: 1,
                unresolved_tools: Vec::new(),
                ledger,
            });
        }

        let specifications = registry.specifications();
        let tool_turns = self.config.max_iterations.saturating_sub(1);
        let mut iterations = 0;
        let mut tools_called = false;
        let mut unresolved_tools = Vec::new();

        while iterations < tool_turns {
            iterations += 1;
            let response = self
                .model
                .chat(ledger.snapshot(), Some(specifications.as_slice()))
                .await?;

            let done = response.tool_calls.is_empty() || response.is_stop();
            let calls = assign_call_ids(response.tool_calls);
            ledger.append(Message::assistant_with_tool_calls(
                response.text.clone(),
                calls.clone(),
            ))?;

            if done {
                debug!(iterations, "Model produced a final answer");
                return Ok(OrchestrationResult {
                    text: response.text,
                    tools_called,
                    no_tools_available: false,
                    termination: Termination::Completed,
                    iterations,
                    unresolved_tools,
                    ledger,
                });
            }

            for call in &calls {
                let executor = match registry.resolve(&call.name) {
                    Ok(executor) => executor,
                    Err(e) => {
                        warn!(tool = %call.name, call_id = %call.id, "{e}, skipping call");
                        unresolved_tools.push(call.name.clone());
                        continue;
                    }
                };

                debug!(tool = %call.name, call_id = %call.id, iteration = iterations, "Executing tool");
                let output = executor
                    .execute(call.arguments.as_deref(), context)
                    .await
                    .unwrap_or_else(|e| {
                        warn!(tool = %call.name, error = %e, "Tool arguments rejected");
                        e.to_string()
                    });
                tools_called = true;

                ledger.append(Message::tool_result(&call.id, &call.name, output))?;
            }
        }

        warn!(
            max_iterations = self.config.max_iterations,
            "Iteration bound reached, requesting a final answer without tools"
        );
        let text = self.direct_call(&mut ledger).await?;
        info!(iterations = iterations + 1, "Fallback answer received");

        Ok(OrchestrationResult {
            text,
            tools_called,
            no_tools_available: false,
            termination: Termination::IterationLimit,
            iterations: iterations + 1,
            unresolved_tools,
            ledger,
        })
    }

    /// One model call without tool metadata; the answer is recorded as a
    /// plain assistant message.
    async fn direct_call(&self, ledger: &mut Ledger) -> Result<String> {
        let response = self.model.chat(ledger.snapshot(), None).await?;
        ledger.append(Message::assistant(response.text.clone()))?;
        Ok(response.text)
    }

    /// Get configuration
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }
}

/// Give every call a correlation id so its result can be matched up
fn assign_call_ids(calls: Vec<ToolCallRequest>) -> Vec<ToolCallRequest> {
    calls
        .into_iter()
        .map(|mut call| {
            if call.id.trim().is_empty() {
                call.id = uuid::Uuid::new_v4().to_string();
            }
            call
        })
        .collect()
}

/// Builder for [`Orchestrator`]
pub struct OrchestratorBuilder {
    model: Option<Arc<dyn ChatModel>>,
    tool_source: Option<Arc<dyn ToolSource>>,
    memory: Option<Arc<dyn MemoryStore>>,
    guardrails: Guardrails,
    config: OrchestratorConfig,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            model: None,
            tool_source: None,
            memory: None,
            guardrails: Guardrails::new(),
            config: OrchestratorConfig::default(),
        }
    }

    #[must_use]
    pub fn model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    #[must_use]
    pub fn tool_source(mut self, source: Arc<dyn ToolSource>) -> Self {
        self.tool_source = Some(source);
        self
    }

    #[must_use]
    pub fn memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    #[must_use]
    pub fn input_guardrail(mut self, guardrail: Arc<dyn InputGuardrail>) -> Self {
        self.guardrails.add_input(guardrail);
        self
    }

    #[must_use]
    pub fn output_guardrail(mut self, guardrail: Arc<dyn OutputGuardrail>) -> Self {
        self.guardrails.add_output(guardrail);
        self
    }

    #[must_use]
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.config.tags = Some(tags.into());
        self
    }

    #[must_use]
    pub fn system_message(mut self, system: impl Into<String>) -> Self {
        self.config.system_message = Some(system.into());
        self
    }

    #[must_use]
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        let model = self
            .model
            .ok_or_else(|| AgentError::Config("Model is required".into()))?;
        self.config.validate()?;

        Ok(Orchestrator {
            model,
            tool_source: self.tool_source,
            memory: self.memory,
            guardrails: self.guardrails,
            config: self.config,
        })
    }
}
