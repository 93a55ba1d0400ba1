//! Tool System
//!
//! A tool is a [`ToolSpecification`] (what the model is told) paired with a
//! [`ToolExecutor`] (what actually runs). Executors parse the model's raw JSON
//! arguments into the request's [`ExecutionContext`] and invoke a
//! [`ToolAction`]. Failures are rendered as text for the model, never raised.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ToolError;

/// Result text used when an action produces nothing
pub const NO_RESULT: &str = "No result";

/// Tool call request emitted by the model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlation id, echoed back on the tool result
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Raw JSON arguments; `None` or blank means no arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Enum of allowed values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    pub fn new(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: false,
            enum_values: None,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Tool definition advertised to the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSpecification {
    /// Unique tool identifier within a registry
    pub name: String,

    /// Human-readable description (shown to the model)
    pub description: String,

    /// Parameter definitions
    #[serde(default)]
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSpecification {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterSchema) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Render the parameters as a JSON Schema object
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut property = Map::new();
            property.insert("type".into(), Value::String(param.param_type.clone()));
            property.insert("description".into(), Value::String(param.description.clone()));
            if let Some(values) = &param.enum_values {
                property.insert("enum".into(), Value::Array(values.clone()));
            }
            properties.insert(param.name.clone(), Value::Object(property));
        }

        let required: Vec<Value> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| Value::String(p.name.clone()))
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Mutable side-channel a tool executor populates before invoking its action.
///
/// Owned by the caller for the lifetime of one request; parsed argument
/// fields land here by name, plus [`Self::TOOL_NAME_KEY`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionContext {
    values: Map<String, Value>,
}

impl ExecutionContext {
    /// Reserved key carrying the resolved tool name
    pub const TOOL_NAME_KEY: &'static str = "ToolName";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String value for `key`, if present and a JSON string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Name of the tool currently being invoked
    pub fn tool_name(&self) -> Option<&str> {
        self.get_str(Self::TOOL_NAME_KEY)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The side-effecting capability behind a tool
#[async_trait]
pub trait ToolAction: Send + Sync {
    /// Run the action against the populated context.
    ///
    /// `Ok(None)` means the action produced no result.
    async fn invoke(&self, context: &mut ExecutionContext) -> anyhow::Result<Option<String>>;
}

/// Adapter turning a plain closure into a [`ToolAction`]
pub struct FnAction<F>(F);

#[async_trait]
impl<F> ToolAction for FnAction<F>
where
    F: Fn(&mut ExecutionContext) -> anyhow::Result<Option<String>> + Send + Sync,
{
    async fn invoke(&self, context: &mut ExecutionContext) -> anyhow::Result<Option<String>> {
        (self.0)(context)
    }
}

/// Wrap a synchronous closure as a shared tool action
pub fn action_fn<F>(f: F) -> Arc<dyn ToolAction>
where
    F: Fn(&mut ExecutionContext) -> anyhow::Result<Option<String>> + Send + Sync + 'static,
{
    Arc::new(FnAction(f))
}

/// Binds one tool name to its action
#[derive(Clone)]
pub struct ToolExecutor {
    name: String,
    action: Arc<dyn ToolAction>,
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor").field("name", &self.name).finish_non_exhaustive()
    }
}

impl ToolExecutor {
    pub fn new(name: impl Into<String>, action: Arc<dyn ToolAction>) -> Self {
        Self {
            name: name.into(),
            action,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parse raw arguments into a JSON object. Absent or blank input is an
    /// empty object.
    pub fn parse_arguments(&self, raw: Option<&str>) -> Result<Map<String, Value>, ToolError> {
        let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
            return Ok(Map::new());
        };

        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(fields)) => Ok(fields),
            Ok(other) => Err(ToolError::ArgumentParse {
                tool: self.name.clone(),
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
            Err(e) => Err(ToolError::ArgumentParse {
                tool: self.name.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Execute the tool.
    ///
    /// Only argument parsing fails; action errors come back as
    /// `Error executing tool '<name>': <message>` text and an empty result
    /// as [`NO_RESULT`].
    pub async fn execute(
        &self,
        arguments: Option<&str>,
        context: &mut ExecutionContext,
    ) -> Result<String, ToolError> {
        let fields = self.parse_arguments(arguments)?;
        for (key, value) in fields {
            context.insert(key, value);
        }
        context.insert(ExecutionContext::TOOL_NAME_KEY, self.name.as_str());

        tracing::debug!(tool = %self.name, "Invoking tool action");

        match self.action.invoke(context).await {
            Ok(Some(output)) if !output.is_empty() => Ok(output),
            Ok(_) => Ok(NO_RESULT.into()),
            Err(e) => {
                let err = ToolError::Execution {
                    tool: self.name.clone(),
                    reason: e.to_string(),
                };
                tracing::warn!(tool = %self.name, error = %e, "Tool action failed");
                Ok(err.to_string())
            }
        }
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather_executor() -> ToolExecutor {
        ToolExecutor::new(
            "get_weather",
            action_fn(|ctx| {
                let city = ctx.get_str("city").unwrap_or("nowhere").to_string();
                Ok(Some(format!("sunny in {city}")))
            }),
        )
    }

    #[tokio::test]
    async fn test_arguments_bound_into_context() {
        let mut ctx = ExecutionContext::new();
        let output = weather_executor()
            .execute(Some(r#"{"city":"Paris","days":3}"#), &mut ctx)
            .await
            .unwrap();

        assert_eq!(output, "sunny in Paris");
        assert_eq!(ctx.get_str("city"), Some("Paris"));
        assert_eq!(ctx.get("days"), Some(&serde_json::json!(3)));
        assert_eq!(ctx.tool_name(), Some("get_weather"));
    }

    #[tokio::test]
    async fn test_blank_arguments_mean_none() {
        let mut ctx = ExecutionContext::new();
        let output = weather_executor().execute(Some("  "), &mut ctx).await.unwrap();
        assert_eq!(output, "sunny in nowhere");
        assert_eq!(ctx.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_is_argument_error() {
        let mut ctx = ExecutionContext::new();
        let err = weather_executor()
            .execute(Some("{not json"), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ArgumentParse { ref tool, .. } if tool == "get_weather"));
        assert!(ctx.is_empty());
    }

    #[tokio::test]
    async fn test_non_object_json_is_argument_error() {
        let mut ctx = ExecutionContext::new();
        let err = weather_executor()
            .execute(Some("[1, 2]"), &mut ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[tokio::test]
    async fn test_action_failure_becomes_text() {
        let executor = ToolExecutor::new(
            "flaky",
            action_fn(|_| Err(anyhow::anyhow!("backend down"))),
        );
        let mut ctx = ExecutionContext::new();
        let output = executor.execute(None, &mut ctx).await.unwrap();
        assert_eq!(output, "Error executing tool 'flaky': backend down");
    }

    #[tokio::test]
    async fn test_missing_result_is_sentinel() {
        let silent = ToolExecutor::new("silent", action_fn(|_| Ok(None)));
        let empty = ToolExecutor::new("empty", action_fn(|_| Ok(Some(String::new()))));
        let mut ctx = ExecutionContext::new();

        assert_eq!(silent.execute(None, &mut ctx).await.unwrap(), NO_RESULT);
        assert_eq!(empty.execute(None, &mut ctx).await.unwrap(), NO_RESULT);
    }

    #[test]
    fn test_parameters_schema() {
        let spec = ToolSpecification::new("get_weather", "Current weather for a city")
            .with_parameter(ParameterSchema::new("city", "string", "City name").required())
            .with_parameter(ParameterSchema::new("unit", "string", "celsius or fahrenheit"));

        let schema = spec.parameters_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["city"]["type"], "string");
        assert_eq!(schema["required"], serde_json::json!(["city"]));
    }
}
