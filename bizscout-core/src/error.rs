//! Error types for BizScout operations

use serde::{Deserialize, Serialize};

/// Result type for BizScout operations
pub type Result<T> = std::result::Result<T, BizScoutError>;

/// Error types for the orchestration core
#[derive(Debug, thiserror::Error)]
pub enum BizScoutError {
    /// The LLM provider failed to produce a turn (transport, status, timeout, malformed body)
    #[error("Provider error: {message}")]
    Provider {
        message: String,
        /// HTTP status, when the failure came from a response
        status: Option<u16>,
        /// Whether a caller-level retry of the whole run may succeed
        retryable: bool,
    },

    /// Final output of an agent did not satisfy its declared output schema
    #[error("Schema violation in agent '{agent}': {message}")]
    SchemaViolation { agent: String, message: String },

    /// A routing agent named a target outside its hand-off set
    #[error("Unknown hand-off target '{target}' requested by agent '{agent}'")]
    UnknownHandoffTarget { agent: String, target: String },

    /// The run exhausted its turn budget without halting
    #[error("Iteration limit of {limit} turns exceeded")]
    IterationLimitExceeded { limit: usize },

    /// The run was cancelled by the caller
    #[error("Run cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Tool registration error
    #[error("Registry error: {0}")]
    Registry(#[from] crate::tools::RegistryError),

    /// Similarity store error
    #[error("Memory error: {0}")]
    Memory(String),

    /// Web search backend error
    #[error("Search error: {0}")]
    Search(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl BizScoutError {
    /// Build a provider error that carries no HTTP status
    pub fn provider(message: impl Into<String>) -> Self {
        BizScoutError::Provider {
            message: message.into(),
            status: None,
            retryable: false,
        }
    }

    /// Build a provider error from an HTTP status
    pub fn provider_status(status: u16, message: impl Into<String>) -> Self {
        BizScoutError::Provider {
            message: message.into(),
            status: Some(status),
            retryable: matches!(status, 429 | 500 | 502 | 503 | 504),
        }
    }

    /// Build a provider error for a transient condition (timeouts, connection resets)
    pub fn provider_transient(message: impl Into<String>) -> Self {
        BizScoutError::Provider {
            message: message.into(),
            status: None,
            retryable: true,
        }
    }

    /// Classify this error for user-facing reporting
    pub fn kind(&self) -> ErrorKind {
        match self {
            BizScoutError::Provider { .. } => ErrorKind::Provider,
            BizScoutError::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            BizScoutError::UnknownHandoffTarget { .. } => ErrorKind::UnknownHandoffTarget,
            BizScoutError::IterationLimitExceeded { .. } => ErrorKind::IterationLimitExceeded,
            BizScoutError::Cancelled => ErrorKind::Cancelled,
            BizScoutError::Configuration(_) | BizScoutError::Registry(_) => {
                ErrorKind::Configuration
            }
            _ => ErrorKind::Internal,
        }
    }

    /// Whether retrying the whole run may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, BizScoutError::Provider { retryable: true, .. })
    }
}

impl From<String> for BizScoutError {
    fn from(s: String) -> Self {
        BizScoutError::Other(s)
    }
}

impl From<&str> for BizScoutError {
    fn from(s: &str) -> Self {
        BizScoutError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for BizScoutError {
    fn from(err: anyhow::Error) -> Self {
        BizScoutError::Other(err.to_string())
    }
}

/// Coarse classification of a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Provider,
    SchemaViolation,
    UnknownHandoffTarget,
    IterationLimitExceeded,
    Cancelled,
    Configuration,
    Internal,
}

impl ErrorKind {
    /// Short message suitable for showing to an end user
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Provider => "The language model service is unavailable. Please try again later.",
            ErrorKind::SchemaViolation => "The assistant produced a malformed result.",
            ErrorKind::UnknownHandoffTarget => "The assistant tried to route to an unknown specialist.",
            ErrorKind::IterationLimitExceeded => {
                "The assistant got stuck in a loop and was stopped."
            }
            ErrorKind::Cancelled => "The request was cancelled.",
            ErrorKind::Configuration => "The assistant is misconfigured.",
            ErrorKind::Internal => "An internal error occurred.",
        }
    }
}

/// Structured failure returned to callers instead of a partial artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&BizScoutError> for RunFailure {
    fn from(err: &BizScoutError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
