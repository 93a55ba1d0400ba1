//! Orchestrator configuration

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::registry::TagSelector;

/// Default bound on model gateway calls per request
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Orchestrator configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum model gateway calls per request, the tool-less fallback
    /// call included
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Comma-separated tool tags; `None` disables tools
    #[serde(default)]
    pub tags: Option<String>,

    /// System text for prompt requests that do not carry their own
    #[serde(default)]
    pub system_message: Option<String>,
}

const fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tags: None,
            system_message: None,
        }
    }
}

impl OrchestratorConfig {
    /// Read `ORCHESTRATOR_MAX_ITERATIONS`, `ORCHESTRATOR_TOOL_TAGS` and
    /// `ORCHESTRATOR_SYSTEM_MESSAGE`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`], reading variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let max_iterations = match lookup("ORCHESTRATOR_MAX_ITERATIONS") {
            Some(value) => value.trim().parse().map_err(|_| {
                AgentError::Config(format!(
                    "ORCHESTRATOR_MAX_ITERATIONS must be a positive integer, got '{value}'"
                ))
            })?,
            None => DEFAULT_MAX_ITERATIONS,
        };

        let config = Self {
            max_iterations,
            tags: lookup("ORCHESTRATOR_TOOL_TAGS"),
            system_message: lookup("ORCHESTRATOR_SYSTEM_MESSAGE"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }
        Ok(())
    }

    /// Parsed tool tag selector (empty when no tags are configured)
    pub fn tag_selector(&self) -> TagSelector {
        self.tags.as_deref().map(TagSelector::parse).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert!(config.tag_selector().is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: OrchestratorConfig =
            serde_json::from_str(r#"{"tags": "weather, users"}"#).unwrap();
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.tag_selector().tags(), ["weather", "users"]);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let config = OrchestratorConfig {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_env_values_read_back() {
        let config = OrchestratorConfig::from_lookup(lookup_from(&[
            ("ORCHESTRATOR_MAX_ITERATIONS", " 4 "),
            ("ORCHESTRATOR_TOOL_TAGS", "weather,users"),
            ("ORCHESTRATOR_SYSTEM_MESSAGE", "Be brief"),
        ]))
        .unwrap();

        assert_eq!(config.max_iterations, 4);
        assert_eq!(config.tag_selector().tags(), ["weather", "users"]);
        assert_eq!(config.system_message.as_deref(), Some("Be brief"));
    }

    #[test]
    fn test_env_bad_max_iterations_rejected() {
        let unparsable =
            OrchestratorConfig::from_lookup(lookup_from(&[("ORCHESTRATOR_MAX_ITERATIONS", "abc")]));
        assert!(matches!(unparsable, Err(AgentError::Config(ref msg)) if msg.contains("'abc'")));

        let zero =
            OrchestratorConfig::from_lookup(lookup_from(&[("ORCHESTRATOR_MAX_ITERATIONS", "0")]));
        assert!(matches!(zero, Err(AgentError::Config(_))));
    }

    #[test]
    fn test_env_defaults_when_unset() {
        let config = OrchestratorConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, OrchestratorConfig::default());
    }

    #[test]
    fn test_from_env_reads_process_environment() {
        let expected = OrchestratorConfig::from_lookup(|key| std::env::var(key).ok());
        let actual = OrchestratorConfig::from_env();
        assert_eq!(actual.ok(), expected.ok());
    }
}
