//! Tool Registry
//!
//! A [`ToolRegistry`] is built fresh for every request from a [`ToolSource`],
//! using a comma-separated [`TagSelector`]. [`TagCatalog`] is the in-process
//! source: tools registered under one or more tags.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::{Result, ToolError};
use crate::tool::{ToolAction, ToolExecutor, ToolSpecification};

/// Parsed comma-separated tag list
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagSelector {
    tags: Vec<String>,
}

impl TagSelector {
    /// Split on commas, trimming entries and dropping empty ones
    pub fn parse(selector: &str) -> Self {
        let mut tags: Vec<String> = Vec::new();
        for tag in selector.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        Self { tags }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Exact string match against one of the selected tags
    pub fn matches(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl std::fmt::Display for TagSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tags.join(","))
    }
}

/// A tool specification paired with its executor
#[derive(Clone, Debug)]
pub struct RegisteredTool {
    pub specification: ToolSpecification,
    pub executor: ToolExecutor,
}

impl RegisteredTool {
    pub fn new(specification: ToolSpecification, action: Arc<dyn ToolAction>) -> Self {
        let executor = ToolExecutor::new(specification.name.clone(), action);
        Self {
            specification,
            executor,
        }
    }
}

/// External discovery of the tools available to one request
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Return every tool whose tag matches the selector, keyed by name.
    ///
    /// Must be deterministic for a given selector within one run.
    async fn discover_tools(&self, selector: &TagSelector) -> Result<ToolRegistry>;
}

/// Name → (specification, executor) for a single orchestration run
#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a source. An empty selector yields an empty
    /// registry without consulting the source.
    pub async fn discover(source: &dyn ToolSource, selector: &TagSelector) -> Result<Self> {
        if selector.is_empty() {
            return Ok(Self::new());
        }
        let registry = source.discover_tools(selector).await?;
        tracing::info!(count = registry.len(), tags = %selector, "Initialized tools");
        Ok(registry)
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, specification: ToolSpecification, action: Arc<dyn ToolAction>) {
        self.insert(RegisteredTool::new(specification, action));
    }

    pub fn insert(&mut self, tool: RegisteredTool) {
        tracing::debug!(
            tool = %tool.specification.name,
            description = %tool.specification.description,
            "Registered tool"
        );
        self.tools.insert(tool.specification.name.clone(), tool);
    }

    /// Get a tool by exact name
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Resolve a tool call's name to its executor
    pub fn resolve(&self, name: &str) -> std::result::Result<&ToolExecutor, ToolError> {
        self.tools
            .get(name)
            .map(|t| &t.executor)
            .ok_or_else(|| ToolError::Unresolved(name.to_string()))
    }

    /// All tool specifications, ordered by name
    pub fn specifications(&self) -> Vec<ToolSpecification> {
        self.tools.values().map(|t| t.specification.clone()).collect()
    }

    /// Tool names, ordered
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Human-readable catalogue of the available tools
    pub fn describe(&self) -> String {
        if self.tools.is_empty() {
            return "No tools are currently available.".into();
        }

        let mut text = String::from("Available tools:\n");
        for spec in self.tools.values().map(|t| &t.specification) {
            text.push_str(&format!("- {}: {}\n", spec.name, spec.description));
            for param in &spec.parameters {
                let required = if param.required { " (required)" } else { "" };
                text.push_str(&format!(
                    "  - `{}` ({}){}: {}\n",
                    param.name, param.param_type, required, param.description
                ));
            }
        }
        text
    }
}

/// In-process [`ToolSource`] keyed by tag.
///
/// Safe to share across concurrent requests.
#[derive(Default)]
pub struct TagCatalog {
    tools: RwLock<HashMap<String, Vec<RegisteredTool>>>,
}

impl TagCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under every tag in `tags` (comma-separated).
    pub fn register(&self, tags: &str, specification: ToolSpecification, action: Arc<dyn ToolAction>) {
        let tool = RegisteredTool::new(specification, action);
        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        for tag in TagSelector::parse(tags).tags() {
            let entry = tools.entry(tag.clone()).or_default();
            entry.retain(|t| t.specification.name != tool.specification.name);
            entry.push(tool.clone());
        }
    }

    /// Known tags, sorted
    pub fn tags(&self) -> Vec<String> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        let mut tags: Vec<String> = tools.keys().cloned().collect();
        tags.sort();
        tags
    }
}

#[async_trait]
impl ToolSource for TagCatalog {
    async fn discover_tools(&self, selector: &TagSelector) -> Result<ToolRegistry> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        let mut registry = ToolRegistry::new();
        for tag in selector.tags() {
            for tool in tools.get(tag).into_iter().flatten() {
                registry.insert(tool.clone());
            }
        }
        Ok(registry)
    }
}
