//! Agent orchestration
//!
//! - **Turn executor**: one provider call per turn
//! - **Conversation machine**: drives a run through
//!   `Running -> AwaitingTools -> Running ... -> Halted`
//! - **Hand-off router**: moves a task between named agents with the full log
//! - **Research pipeline**: the default triage/research/analysis/editor graph
//!
//! # Example
//!
//! ```rust,ignore
//! use bizscout_core::workflow::{research_pipeline, AgentRuntime, TRIAGE_AGENT};
//!
//! let runtime = AgentRuntime::from_config(provider, registry, &config);
//! let router = research_pipeline(runtime)?;
//!
//! let outcome = router
//!     .run_pipeline(TRIAGE_AGENT, vec![Message::user("Best cafe concepts for Agra")])
//!     .await?;
//! let report: ResearchReport = outcome.artifact.parse()?;
//! ```

mod executor;
mod machine;
mod pipeline;
mod router;
mod runtime;

pub use executor::{TurnConfig, TurnExecutor};
pub use machine::{
    validate_output, ConversationMachine, MachineConfig, MachineState, RunOutcome, RunState,
    SchemaPolicy,
};
pub use pipeline::{
    research_agents, research_pipeline, ResearchPlan, ResearchReport,
    COMPETITIVE_ANALYSIS_AGENT, EDITOR_AGENT, RESEARCH_AGENT, TRIAGE_AGENT,
};
pub use router::{HandoffRouter, HandoffRouterBuilder, Hop, PipelineOutcome};
pub use runtime::AgentRuntime;
