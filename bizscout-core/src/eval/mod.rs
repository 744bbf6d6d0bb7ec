//! Deterministic doubles for offline evaluation of agent runs
//!
//! Runs are driven by a [`ScriptedProvider`] that replays canned assistant
//! turns, and tools are replaced with [`StubTool`]s that return
//! predetermined responses. No network, no real LLM calls.
//!
//! # Example
//!
//! ```rust,ignore
//! use bizscout_core::eval::{ScriptedProvider, StubResponse, StubTool};
//!
//! let provider = ScriptedProvider::new()
//!     .reply_tool_calls(vec![ToolCall::new("call_1", "search", json!({"query": "cafes"}))])
//!     .reply_text("Cafes are growing 5% a year.");
//!
//! let search = StubTool::new("search", StubResponse::success(json!("cafe market data")));
//! ```

pub mod stub;

pub use stub::{ScriptedProvider, StubError, StubResponse, StubTool};
