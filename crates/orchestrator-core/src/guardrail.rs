//! Guardrails
//!
//! Optional validation hooks around a request: input guardrails see the
//! outbound user message before the first model call, output guardrails see
//! the final answer. A rejection aborts the request; nothing is retried.

use std::sync::Arc;

use crate::error::{AgentError, GuardrailStage, Result};

/// Outcome of a single guardrail check
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailVerdict {
    Pass,
    Reject(String),
}

/// Validates the user message before it reaches the model
pub trait InputGuardrail: Send + Sync {
    fn validate(&self, user_message: &str) -> GuardrailVerdict;
}

/// Validates the model's final answer
pub trait OutputGuardrail: Send + Sync {
    fn validate(&self, response: &str) -> GuardrailVerdict;
}

/// Ordered input and output guardrail chains
#[derive(Clone, Default)]
pub struct Guardrails {
    input: Vec<Arc<dyn InputGuardrail>>,
    output: Vec<Arc<dyn OutputGuardrail>>,
}

impl Guardrails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, guardrail: Arc<dyn InputGuardrail>) {
        self.input.push(guardrail);
    }

    pub fn add_output(&mut self, guardrail: Arc<dyn OutputGuardrail>) {
        self.output.push(guardrail);
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty() && self.output.is_empty()
    }

    /// Run every input guardrail in order; the first rejection wins
    pub fn check_input(&self, user_message: &str) -> Result<()> {
        for guardrail in &self.input {
            if let GuardrailVerdict::Reject(reason) = guardrail.validate(user_message) {
                tracing::warn!(%reason, "Input guardrail rejected request");
                return Err(AgentError::Guardrail {
                    stage: GuardrailStage::Input,
                    reason,
                });
            }
        }
        Ok(())
    }

    /// Run every output guardrail in order; the first rejection wins
    pub fn check_output(&self, response: &str) -> Result<()> {
        for guardrail in &self.output {
            if let GuardrailVerdict::Reject(reason) = guardrail.validate(response) {
                tracing::warn!(%reason, "Output guardrail rejected response");
                return Err(AgentError::Guardrail {
                    stage: GuardrailStage::Output,
                    reason,
                });
            }
        }
        Ok(())
    }
}
