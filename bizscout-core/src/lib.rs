//! # BizScout - multi-agent business research
//!
//! BizScout drives LLM agents through a tool-calling loop and routes work
//! between specialised agents:
//! - Tool registry and dispatcher with per-call timeouts
//! - Turn executor over pluggable LLM providers
//! - Conversation state machine with an iteration ceiling and output schemas
//! - Hand-off router that moves a task between agents with its full log
//! - Chat sessions with collected facts and long-term memory
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bizscout_core::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = BizScoutConfig::load()?;
//!     let provider = LLMProviderFactory::create(&config.llm)?;
//!
//!     let mut registry = ToolRegistry::new();
//!     registry.register(Arc::new(SaveFactTool::new()))?;
//!
//!     let runtime = AgentRuntime::from_config(provider, Arc::new(registry), &config);
//!     let pipeline = research_pipeline(runtime)?;
//!
//!     let outcome = pipeline
//!         .run_pipeline(TRIAGE_AGENT, vec![Message::user("Cloud kitchens in Agra")])
//!         .await?;
//!     println!("{}", outcome.artifact.as_text());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `llm-openai`: OpenAI chat completions provider
//! - `llm-gemini`: Google Gemini provider
//! - `search-tavily`: Tavily web search backend
//! - `search-serpapi`: SerpAPI web search backend

pub mod agent;
pub mod config;
pub mod conversation;
pub mod error;
pub mod eval;
pub mod events;
pub mod llm;
pub mod memory;
pub mod parsing;
pub mod search;
pub mod tools;
pub mod workflow;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::agent::{AgentOutput, AgentSpec, AgentSpecBuilder, RoutingDecision};
    pub use crate::config::BizScoutConfig;
    pub use crate::conversation::{CollectedFact, Session};
    pub use crate::error::{BizScoutError, ErrorKind, Result};
    pub use crate::events::{event_channel, EventReceiver, EventSender, RunEvent};
    pub use crate::llm::{
        CompletionRequest, LLMProvider, LLMProviderFactory, Message, MessageRole, ToolCall,
    };
    pub use crate::memory::{Document, InMemoryStore, SimilarityStore};
    pub use crate::tools::{
        SaveFactTool, Tool, ToolContext, ToolDispatcher, ToolRegistry, WebSearchTool,
    };
    pub use crate::workflow::{
        research_pipeline, AgentRuntime, ConversationMachine, HandoffRouter, PipelineOutcome,
        ResearchReport, RunOutcome, TurnExecutor, TRIAGE_AGENT,
    };
}

pub use error::{BizScoutError, Result};
