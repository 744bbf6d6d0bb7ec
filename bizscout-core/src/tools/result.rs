//! Tool outcomes and the tool error model
//!
//! Every dispatched call produces a [`ToolResultEnvelope`]: what happened
//! plus where it came from. The envelope renders to the text the model sees
//! through [`ToolResultEnvelope::to_content`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Outcome of one tool call with its provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultEnvelope {
    pub result: ToolResult,
    pub provenance: ToolProvenance,
}

impl ToolResultEnvelope {
    pub fn success(value: Value, provenance: ToolProvenance) -> Self {
        Self {
            result: ToolResult::Success { value },
            provenance,
        }
    }

    pub fn error(error: ToolError, provenance: ToolProvenance) -> Self {
        Self {
            result: ToolResult::Error { error },
            provenance,
        }
    }

    pub fn cancelled(reason: impl Into<String>, provenance: ToolProvenance) -> Self {
        Self {
            result: ToolResult::Cancelled {
                reason: reason.into(),
            },
            provenance,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, ToolResult::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self.result, ToolResult::Error { .. })
    }

    pub fn get_error(&self) -> Option<&ToolError> {
        match &self.result {
            ToolResult::Error { error } => Some(error),
            _ => None,
        }
    }

    /// Text appended to the conversation as the tool result.
    ///
    /// Strings pass through verbatim; errors are prefixed with `Error:` so
    /// the model can react to them.
    pub fn to_content(&self) -> String {
        match &self.result {
            ToolResult::Success { value } => match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            },
            ToolResult::Error { error } => format!("Error: {}", error.message),
            ToolResult::Cancelled { reason } => format!("Cancelled: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success { value: Value },
    Error { error: ToolError },
    Cancelled { reason: String },
}

/// Failure of a single tool call. Never leaves the dispatcher as an `Err`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,

    /// Shown to the model after `Error: `
    pub message: String,

    /// Short machine-readable code, e.g. the search backend name
    pub code: Option<String>,

    /// Per-field problems when `kind` is `Validation`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<ValidationError>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            field_errors: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Arguments did not match the tool's schema
    pub fn validation(errors: Vec<ValidationError>) -> Self {
        let summary = errors
            .iter()
            .map(ValidationError::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            field_errors: errors,
            ..Self::new(ToolErrorKind::Validation, format!("Validation failed: {}", summary))
                .with_code("VALIDATION_FAILED")
        }
    }

    pub fn timeout(duration: Duration) -> Self {
        Self::new(
            ToolErrorKind::Timeout,
            format!("Tool execution timed out after {:?}", duration),
        )
        .with_code("TIMEOUT")
    }

    /// Upstream service failure (search backend down, rate limited)
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Transient, message).with_code("TRANSIENT")
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Arguments rejected before execution
    Validation,
    Timeout,
    /// Upstream service error
    Transient,
    /// The model called a tool that is not registered
    UnknownTool,
    /// Bug or unexpected state inside the tool
    Internal,
    Cancelled,
}

impl ToolErrorKind {
    /// Whether the model retrying the same call could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ToolErrorKind::Timeout | ToolErrorKind::Transient)
    }
}

/// A schema violation in one argument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// JSON pointer of the offending value (`$` for the root)
    pub field: String,
    pub message: String,
    pub code: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}: {}", code, self.field, self.message),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}

/// Which call a result answers, for whom, and how long it took
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolProvenance {
    pub tool_name: String,
    pub call_id: String,

    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// Agent whose turn requested the call
    pub agent: Option<String>,
}

impl ToolProvenance {
    pub fn new(tool_name: impl Into<String>, call_id: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            call_id: call_id.into(),
            duration: Duration::ZERO,
            agent: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }
}
