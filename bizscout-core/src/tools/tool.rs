//! Tool trait and metadata definitions
//!
//! Tools are the primary way agents interact with the world.
//! Each tool declares its parameters and execution logic; the dispatcher
//! wraps execution with timeouts, cancellation and result formatting.

use super::result::{ToolError, ValidationError};
use crate::events::EventSender;
use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Tool metadata for LLM-friendly discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Tool name (unique identifier)
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// When should the LLM use this tool?
    pub usage_hints: Vec<String>,

    /// What the tool returns
    pub returns: String,

    /// Tags for categorization
    pub tags: Vec<String>,
}

impl ToolMetadata {
    /// Create new metadata with required fields
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            usage_hints: Vec::new(),
            returns: "Tool-specific result".to_string(),
            tags: Vec::new(),
        }
    }

    /// Add a usage hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.usage_hints.push(hint.into());
        self
    }

    /// Set return description
    pub fn with_returns(mut self, returns: impl Into<String>) -> Self {
        self.returns = returns.into();
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Description shown to the model, with usage hints appended
    pub fn prompt_description(&self) -> String {
        if self.usage_hints.is_empty() {
            return self.description.clone();
        }
        format!("{} {}", self.description, self.usage_hints.join(" "))
    }
}

/// JSON Schema for tool parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// JSON Schema for input parameters
    pub parameters: Value,

    /// Whether arguments are validated against the schema before execution
    pub strict: bool,
}

impl ToolSchema {
    /// Create a schema from a JSON Schema value
    pub fn new(parameters: Value) -> Self {
        Self {
            parameters,
            strict: true,
        }
    }

    /// Create an empty schema (tool takes no parameters)
    pub fn empty() -> Self {
        Self {
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
            strict: true,
        }
    }

    /// Set strict mode
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Validate arguments against the schema.
    ///
    /// A schema that fails to compile is reported as a single error on the
    /// root path rather than silently accepting everything.
    pub fn validate(&self, args: &Value) -> Result<(), Vec<ValidationError>> {
        if !self.strict {
            return Ok(());
        }

        let validator = jsonschema::validator_for(&self.parameters).map_err(|e| {
            vec![ValidationError::new("$", format!("invalid tool schema: {e}")).with_code("SCHEMA")]
        })?;

        let errors: Vec<ValidationError> = validator
            .iter_errors(args)
            .map(|e| {
                let path = e.instance_path.to_string();
                let field = if path.is_empty() { "$".to_string() } else { path };
                ValidationError::new(field, e.to_string())
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Context provided to tool execution
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    /// Agent whose turn requested the call
    pub agent: Option<String>,

    /// Run identifier for correlation
    pub run_id: Option<String>,

    /// Identifier of the call being executed
    pub call_id: Option<String>,

    /// Channel for side-channel events such as collected facts
    pub events: Option<EventSender>,
}

impl ToolExecutionContext {
    /// Create a new context
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }
}

/// Core tool trait
///
/// Implement this trait to create a tool that agents can use. The
/// dispatcher validates arguments, then calls `execute` under a timeout.
/// A string return value is shown to the model verbatim; any other JSON is
/// serialized.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get tool metadata
    fn metadata(&self) -> &ToolMetadata;

    /// Get tool name (convenience method)
    fn name(&self) -> &str {
        &self.metadata().name
    }

    /// Get tool description (convenience method)
    fn description(&self) -> &str {
        &self.metadata().description
    }

    /// Get the JSON schema for this tool's parameters
    fn schema(&self) -> ToolSchema;

    /// Validate input arguments before execution
    ///
    /// Default implementation checks the arguments against [`Tool::schema`].
    fn validate(&self, args: &Value) -> Result<(), Vec<ValidationError>> {
        self.schema().validate(args)
    }

    /// Definition handed to the LLM provider
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.metadata().prompt_description(),
            parameters: self.schema().parameters,
        }
    }

    /// Execute the tool with given arguments
    async fn execute(&self, args: Value, ctx: &ToolExecutionContext) -> Result<Value, ToolError>;
}

/// Type alias for boxed tools
pub type BoxedTool = Arc<dyn Tool>;

#[cfg(test)]
mod tool_tests {
    use super::*;
    use serde_json::json;

    struct EchoTool {
        metadata: ToolMetadata,
    }

    impl EchoTool {
        fn new() -> Self {
            Self {
                metadata: ToolMetadata::new("echo", "Echoes input back")
                    .with_hint("Use when you need to test tool execution")
                    .with_returns("The same value passed as input"),
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn metadata(&self) -> &ToolMetadata {
            &self.metadata
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::new(json!({
                "type": "object",
                "properties": {
                    "message": { "type": "string" }
                },
                "required": ["message"]
            }))
        }

        async fn execute(
            &self,
            args: Value,
            _ctx: &ToolExecutionContext,
        ) -> Result<Value, ToolError> {
            Ok(args.get("message").cloned().unwrap_or(Value::Null))
        }
    }

    #[tokio::test]
    async fn test_tool_execution() {
        let tool = EchoTool::new();
        let ctx = ToolExecutionContext::new().with_agent("test_agent");

        let result = tool.execute(json!({ "message": "hello" }), &ctx).await.unwrap();

        assert_eq!(result, json!("hello"));
    }

    #[test]
    fn test_default_validation_uses_schema() {
        let tool = EchoTool::new();

        assert!(tool.validate(&json!({"message": "hi"})).is_ok());

        let errors = tool.validate(&json!({"message": 42})).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "/message");

        let errors = tool.validate(&json!({})).unwrap_err();
        assert_eq!(errors[0].field, "$");
    }

    #[test]
    fn test_non_strict_schema_skips_validation() {
        let schema = ToolSchema::empty().with_strict(false);
        assert!(schema.validate(&json!({"anything": true})).is_ok());
    }

    #[test]
    fn test_definition_includes_hints() {
        let definition = EchoTool::new().definition();
        assert_eq!(definition.name, "echo");
        assert!(definition.description.starts_with("Echoes input back"));
        assert!(definition.description.contains("test tool execution"));
        assert_eq!(definition.parameters["required"], json!(["message"]));
    }
}
