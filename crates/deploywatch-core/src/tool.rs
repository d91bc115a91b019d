//! Core tool trait and types for function calling.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Error;

/// Tool execution result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the execution was successful
    pub success: bool,
    /// The result data (markdown text or structured JSON)
    pub data: Value,
    /// Optional error message if success is false
    pub error: Option<String>,
}

impl ToolOutput {
    /// Create a successful output.
    pub fn success(data: impl Into<Value>) -> Self {
        Self {
            success: true,
            data: data.into(),
            error: None,
        }
    }

    /// Create a successful output carrying markdown text.
    pub fn text(text: impl Into<String>) -> Self {
        Self::success(Value::String(text.into()))
    }

    /// Create a failed output.
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
        }
    }

    /// The output as text, for feeding back to the LLM.
    pub fn as_text(&self) -> String {
        match &self.data {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Tool definition for LLM function calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// Parameters as a JSON Schema object
    pub parameters: Value,
}

/// Tool error types.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    /// Tool not found
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Invalid arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Execution error
    #[error("Execution error: {0}")]
    Execution(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for tool operations.
pub type ToolResult<T> = std::result::Result<T, ToolError>;

impl From<ToolError> for Error {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::NotFound(s) => Error::NotFound(s),
            ToolError::InvalidArguments(s) => Error::Validation(s),
            ToolError::Execution(s) => Error::Tool(s),
            ToolError::Serialization(s) => Error::Serialization(s),
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::Serialization(err.to_string())
    }
}

/// Tool trait for function calling.
///
/// Tools are callable functions that the LLM agent can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name.
    fn name(&self) -> &str;

    /// Get the tool description.
    fn description(&self) -> &str;

    /// Get the parameters as JSON Schema.
    fn parameters(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value) -> ToolResult<ToolOutput>;

    /// Get the full definition for LLM function calling.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Shared reference to a tool.
pub type DynTool = Arc<dyn Tool>;

// JSON Schema builder helpers, shared by all tool implementations.

/// A string property with a description.
pub fn string_property(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

/// An integer property with a description.
pub fn integer_property(description: &str) -> Value {
    json!({ "type": "integer", "description": description })
}

/// An object schema from (name, property) pairs and required names.
pub fn object_schema(properties: &[(&str, Value)], required: &[&str]) -> Value {
    let props: serde_json::Map<String, Value> = properties
        .iter()
        .map(|(name, prop)| (name.to_string(), prop.clone()))
        .collect();
    json!({
        "type": "object",
        "properties": props,
        "required": required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_constructors() {
        let ok = ToolOutput::text("## Report");
        assert!(ok.success);
        assert_eq!(ok.as_text(), "## Report");

        let err = ToolOutput::error("lookup failed");
        assert!(!err.success);
        assert_eq!(err.error.as_deref(), Some("lookup failed"));
    }

    #[test]
    fn test_object_schema() {
        let schema = object_schema(
            &[
                ("deployment_id", string_property("Deployment ID")),
                ("limit", integer_property("Max rows")),
            ],
            &["deployment_id"],
        );
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["deployment_id"]["type"], "string");
        assert_eq!(schema["required"][0], "deployment_id");
    }

    #[test]
    fn test_tool_error_conversion() {
        let err: Error = ToolError::NotFound("my_tool".to_string()).into();
        assert!(matches!(err, Error::NotFound(_)));
        let err: Error = ToolError::InvalidArguments("bad".to_string()).into();
        assert!(matches!(err, Error::Validation(_)));
    }
}
