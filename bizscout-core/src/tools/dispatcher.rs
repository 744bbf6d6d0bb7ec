//! Tool dispatcher
//!
//! Resolves a batch of tool calls against the registry and turns every
//! call into exactly one tool-result message carrying the call's id as its
//! correlation id. Failures never escape the dispatcher: unknown tools,
//! invalid arguments, tool errors and timeouts all become result text the
//! model can react to.

use super::registry::ToolRegistry;
use super::result::{ToolError, ToolErrorKind, ToolProvenance, ToolResultEnvelope};
use super::tool::ToolExecutionContext;
use crate::config::OrchestrationConfig;
use crate::events::{EventSender, RunEvent};
use crate::llm::{Message, ToolCall};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Content returned to the model when it calls a tool that does not exist.
pub const TOOL_NOT_FOUND_MESSAGE: &str = "tool not found, please retry";

/// Context for one dispatched batch
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Agent whose turn requested the calls
    pub agent: Option<String>,

    /// Run identifier for correlation
    pub run_id: Option<String>,

    /// Cancellation token
    pub cancellation: Option<CancellationToken>,

    /// Run event channel
    pub events: Option<EventSender>,
}

impl ToolContext {
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

    /// Set cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map(|t| t.is_cancelled())
            .unwrap_or(false)
    }

    /// Convert to the context handed to a single tool
    pub fn to_execution_context(&self, call_id: &str) -> ToolExecutionContext {
        ToolExecutionContext {
            agent: self.agent.clone(),
            run_id: self.run_id.clone(),
            call_id: Some(call_id.to_string()),
            events: self.events.clone(),
        }
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Default timeout for tool execution
    pub default_timeout: Duration,

    /// Per-tool timeout overrides
    pub tool_timeouts: HashMap<String, Duration>,

    /// Execute a batch concurrently instead of one call at a time
    pub parallel: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            tool_timeouts: HashMap::new(),
            parallel: false,
        }
    }
}

impl DispatcherConfig {
    /// Build from the orchestration section of the configuration file
    pub fn from_orchestration(config: &OrchestrationConfig) -> Self {
        Self {
            default_timeout: config.tool_timeout,
            tool_timeouts: config.tool_timeout_overrides(),
            parallel: config.parallel_tools,
        }
    }

    /// Create a config with a specific timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Add a tool-specific timeout
    pub fn with_tool_timeout(mut self, tool_name: impl Into<String>, timeout: Duration) -> Self {
        self.tool_timeouts.insert(tool_name.into(), timeout);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Executes tool calls against a shared registry
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    config: DispatcherConfig,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self::with_config(registry, DispatcherConfig::default())
    }

    pub fn with_config(registry: Arc<ToolRegistry>, config: DispatcherConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Get timeout for a specific tool
    fn timeout_for(&self, tool_name: &str) -> Duration {
        self.config
            .tool_timeouts
            .get(tool_name)
            .copied()
            .unwrap_or(self.config.default_timeout)
    }

    /// Execute a batch and return one tool-result message per call, in input order.
    pub async fn dispatch(&self, calls: &[ToolCall], ctx: &ToolContext) -> Vec<Message> {
        let envelopes = self.dispatch_envelopes(calls, ctx).await;

        calls
            .iter()
            .zip(envelopes.iter())
            .map(|(call, envelope)| {
                Message::tool_result(
                    call.call_id.clone(),
                    call.tool_name.clone(),
                    render_content(envelope),
                )
            })
            .collect()
    }

    /// Execute a batch and return the structured envelopes, in input order.
    pub async fn dispatch_envelopes(
        &self,
        calls: &[ToolCall],
        ctx: &ToolContext,
    ) -> Vec<ToolResultEnvelope> {
        if self.config.parallel {
            futures::future::join_all(calls.iter().map(|call| self.execute_call(call, ctx))).await
        } else {
            let mut envelopes = Vec::with_capacity(calls.len());
            for call in calls {
                envelopes.push(self.execute_call(call, ctx).await);
            }
            envelopes
        }
    }

    /// Execute one call with lookup, validation, timeout and cancellation
    async fn execute_call(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResultEnvelope {
        let started = Instant::now();
        let mut provenance = ToolProvenance::new(&call.tool_name, &call.call_id);
        if let Some(ref agent) = ctx.agent {
            provenance = provenance.with_agent(agent);
        }

        let envelope = self.run_call(call, ctx, provenance).await;
        let envelope = ToolResultEnvelope {
            provenance: envelope.provenance.with_duration(started.elapsed()),
            ..envelope
        };

        if let Some(error) = envelope.get_error() {
            warn!(
                tool = %call.tool_name,
                call_id = %call.call_id,
                kind = ?error.kind,
                error = %error.message,
                "Tool call failed"
            );
        }

        if let Some(events) = &ctx.events {
            let _ = events
                .send(RunEvent::ToolCompleted {
                    run_id: ctx.run_id.clone().unwrap_or_default(),
                    agent: ctx.agent.clone().unwrap_or_default(),
                    call_id: call.call_id.clone(),
                    tool_name: call.tool_name.clone(),
                    success: envelope.is_success(),
                    duration_ms: envelope.provenance.duration.as_millis() as u64,
                })
                .await;
        }

        envelope
    }

    async fn run_call(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
        provenance: ToolProvenance,
    ) -> ToolResultEnvelope {
        if ctx.is_cancelled() {
            return ToolResultEnvelope::cancelled("run cancelled before execution", provenance);
        }

        let Some(tool) = self.registry.get(&call.tool_name) else {
            return ToolResultEnvelope::error(
                ToolError::new(ToolErrorKind::UnknownTool, TOOL_NOT_FOUND_MESSAGE),
                provenance,
            );
        };

        if let Err(errors) = tool.validate(&call.arguments) {
            return ToolResultEnvelope::error(ToolError::validation(errors), provenance);
        }

        let tool_timeout = self.timeout_for(&call.tool_name);
        let exec_ctx = ctx.to_execution_context(&call.call_id);
        debug!(
            tool = %call.tool_name,
            call_id = %call.call_id,
            timeout_ms = tool_timeout.as_millis() as u64,
            "Executing tool"
        );

        let execution = tool.execute(call.arguments.clone(), &exec_ctx);

        // Combine timeout with cancellation
        let result = if let Some(ref cancel_token) = ctx.cancellation {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    Err(ToolError::new(ToolErrorKind::Cancelled, "run cancelled during execution"))
                }
                res = timeout(tool_timeout, execution) => {
                    res.unwrap_or_else(|_| Err(ToolError::timeout(tool_timeout)))
                }
            }
        } else {
            timeout(tool_timeout, execution)
                .await
                .unwrap_or_else(|_| Err(ToolError::timeout(tool_timeout)))
        };

        match result {
            Ok(value) => ToolResultEnvelope::success(value, provenance),
            Err(error) if error.kind == ToolErrorKind::Cancelled => {
                ToolResultEnvelope::cancelled(error.message, provenance)
            }
            Err(error) => ToolResultEnvelope::error(error, provenance),
        }
    }
}

/// Unknown tools get the fixed retry hint; everything else renders normally.
fn render_content(envelope: &ToolResultEnvelope) -> String {
    match envelope.get_error() {
        Some(error) if error.kind == ToolErrorKind::UnknownTool => TOOL_NOT_FOUND_MESSAGE.to_string(),
        _ => envelope.to_content(),
    }
}
