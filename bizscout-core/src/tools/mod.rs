//! Tool system for agent capabilities
//!
//! Tools are registered once in a [`ToolRegistry`] and executed by the
//! [`ToolDispatcher`], which turns every requested call into exactly one
//! tool-result message. Key features:
//! - Name-keyed registry shared read-only across runs
//! - Argument validation against each tool's JSON Schema
//! - Per-tool timeouts and cancellation
//! - Structured result envelopes with provenance
//!
//! # Example
//!
//! ```rust,ignore
//! use bizscout_core::tools::{SaveFactTool, ToolContext, ToolDispatcher, ToolRegistry};
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(Arc::new(SaveFactTool::new()))?;
//!
//! let dispatcher = ToolDispatcher::new(Arc::new(registry));
//! let results = dispatcher.dispatch(&reply.tool_calls, &ToolContext::new()).await;
//! ```

mod builtin;
mod dispatcher;
mod registry;
mod result;
mod tool;

pub use builtin::{SaveFactTool, WebSearchTool, SAVE_FACT_TOOL_NAME, SEARCH_TOOL_NAME};
pub use dispatcher::{DispatcherConfig, ToolContext, ToolDispatcher, TOOL_NOT_FOUND_MESSAGE};
pub use registry::{RegistryError, ToolRegistry};
pub use result::{
    ToolError, ToolErrorKind, ToolProvenance, ToolResult, ToolResultEnvelope, ValidationError,
};
pub use tool::{BoxedTool, Tool, ToolExecutionContext, ToolMetadata, ToolSchema};
