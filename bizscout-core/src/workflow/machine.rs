//! Conversation state machine
//!
//! Drives one agent's run from a seeded log to a terminal state:
//!
//! ```text
//! Running --(reply has tool calls)--> AwaitingTools --(results appended)--> Running
//! Running --(reply has no tool calls)--> Halted
//! any --(provider error, cancellation, ceiling, schema violation)--> Failed
//! ```
//!
//! The log only grows: replies and tool results are appended at the end,
//! never inserted or removed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::executor::TurnExecutor;
use crate::agent::{AgentOutput, AgentSpec};
use crate::config::OrchestrationConfig;
use crate::error::{BizScoutError, Result, RunFailure};
use crate::events::{EventEmitter, EventSender};
use crate::llm::Message;
use crate::parsing::{JsonParser, OutputParser};
use crate::tools::{ToolContext, ToolDispatcher};

/// What to do when a final answer fails the agent's output schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaPolicy {
    /// Fail the run with a schema violation
    #[default]
    Strict,
    /// Accept the answer as free text and log a warning
    FallbackToText,
}

/// Per-run limits and policies
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Maximum turn-executor calls per run
    pub max_iterations: usize,
    pub schema_policy: SchemaPolicy,
    pub cancellation: Option<CancellationToken>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            schema_policy: SchemaPolicy::Strict,
            cancellation: None,
        }
    }
}

impl MachineConfig {
    pub fn from_orchestration(config: &OrchestrationConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            schema_policy: config.schema_policy,
            cancellation: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_schema_policy(mut self, policy: SchemaPolicy) -> Self {
        self.schema_policy = policy;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map(|t| t.is_cancelled())
            .unwrap_or(false)
    }
}

/// Machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineState {
    Running,
    AwaitingTools,
    Halted,
    Failed,
}

impl MachineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MachineState::Halted | MachineState::Failed)
    }
}

/// Mutable state of one run, owned by its machine
#[derive(Debug, Clone)]
pub struct RunState {
    pub log: Vec<Message>,
    pub agent: String,
    /// Turn-executor calls made so far
    pub turns_taken: usize,
}

/// Result of a halted run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    pub agent: String,
    pub output: AgentOutput,
    /// Full log, seed included
    pub log: Vec<Message>,
    pub turns_taken: usize,
}

/// Runs one agent to completion.
///
/// A machine is single-use: after `run` returns it sits in a terminal state
/// and further calls are rejected.
///
/// # Example
///
/// ```rust,ignore
/// let mut machine = ConversationMachine::new(agent, executor, dispatcher, MachineConfig::default());
/// let outcome = machine.run(vec![Message::user("Size the Pune cafe market")]).await?;
/// println!("{}", outcome.output.as_text());
/// ```
pub struct ConversationMachine {
    agent: Arc<AgentSpec>,
    executor: Arc<TurnExecutor>,
    dispatcher: ToolDispatcher,
    config: MachineConfig,
    events: Option<EventSender>,
    run_id: String,
    state: MachineState,
}

impl std::fmt::Debug for ConversationMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationMachine")
            .field("agent", &self.agent.name())
            .field("run_id", &self.run_id)
            .field("state", &self.state)
            .finish()
    }
}

impl ConversationMachine {
    pub fn new(
        agent: Arc<AgentSpec>,
        executor: Arc<TurnExecutor>,
        dispatcher: ToolDispatcher,
        config: MachineConfig,
    ) -> Self {
        Self {
            agent,
            executor,
            dispatcher,
            config,
            events: None,
            run_id: uuid::Uuid::new_v4().to_string(),
            state: MachineState::Running,
        }
    }

    /// Send run events to a channel
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn agent(&self) -> &Arc<AgentSpec> {
        &self.agent
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    /// Drive the run from `input` to a terminal state
    #[instrument(skip(self, input), fields(agent = %self.agent.name(), run_id = %self.run_id))]
    pub async fn run(&mut self, input: Vec<Message>) -> Result<RunOutcome> {
        let emitter = EventEmitter::new(self.events.clone(), &self.run_id, self.agent.name());

        if self.state != MachineState::Running {
            return Err(BizScoutError::Configuration(format!(
                "Run {} has already finished",
                self.run_id
            )));
        }
        if input.is_empty() {
            return self
                .fail(
                    &emitter,
                    BizScoutError::Configuration("A run needs at least one input message".to_string()),
                )
                .await;
        }

        info!(seed_messages = input.len(), "Run started");
        emitter.run_started().await;

        let mut run = RunState {
            log: input,
            agent: self.agent.name().to_string(),
            turns_taken: 0,
        };

        loop {
            match self.state {
                MachineState::Running => {
                    if self.config.is_cancelled() {
                        return self.fail(&emitter, BizScoutError::Cancelled).await;
                    }
                    if run.turns_taken >= self.config.max_iterations {
                        return self
                            .fail(
                                &emitter,
                                BizScoutError::IterationLimitExceeded {
                                    limit: self.config.max_iterations,
                                },
                            )
                            .await;
                    }

                    run.turns_taken += 1;
                    debug!(turn = run.turns_taken, "Executing turn");
                    emitter.turn_started(run.turns_taken).await;

                    let reply = match self.execute_turn(&run.log).await {
                        Ok(reply) => reply,
                        Err(e) => return self.fail(&emitter, e).await,
                    };

                    let has_tool_calls = reply.has_tool_calls();
                    let content = reply.text();
                    self.append(&mut run, reply, &emitter).await;

                    if has_tool_calls {
                        self.state = MachineState::AwaitingTools;
                        continue;
                    }

                    let output = match self.resolve_output(&content) {
                        Ok(output) => output,
                        Err(e) => return self.fail(&emitter, e).await,
                    };

                    self.state = MachineState::Halted;
                    info!(turns_taken = run.turns_taken, "Run halted");
                    emitter.halted(run.turns_taken).await;

                    return Ok(RunOutcome {
                        run_id: self.run_id.clone(),
                        agent: run.agent,
                        output,
                        log: run.log,
                        turns_taken: run.turns_taken,
                    });
                }

                MachineState::AwaitingTools => {
                    let calls = run
                        .log
                        .last()
                        .map(|m| m.tool_calls.clone())
                        .unwrap_or_default();
                    debug!(calls = calls.len(), "Dispatching tool calls");
                    emitter.tool_calls_requested(&calls).await;

                    let ctx = self.tool_context();
                    let results = self.dispatcher.dispatch(&calls, &ctx).await;
                    debug_assert_eq!(results.len(), calls.len());

                    for result in results {
                        self.append(&mut run, result, &emitter).await;
                    }
                    self.state = MachineState::Running;
                }

                MachineState::Halted | MachineState::Failed => {
                    return Err(BizScoutError::Configuration(format!(
                        "Run {} has already finished",
                        self.run_id
                    )));
                }
            }
        }
    }

    /// One executor call, raced against cancellation
    async fn execute_turn(&self, log: &[Message]) -> Result<Message> {
        let turn = self.executor.execute_with_schema(
            log,
            self.agent.instructions(),
            self.agent.tools(),
            self.agent.output_schema(),
        );

        match &self.config.cancellation {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => Err(BizScoutError::Cancelled),
                    reply = turn => reply,
                }
            }
            None => turn.await,
        }
    }

    async fn append(&self, run: &mut RunState, message: Message, emitter: &EventEmitter) {
        let index = run.log.len();
        emitter.message_appended(index, &message).await;
        run.log.push(message);
    }

    fn tool_context(&self) -> ToolContext {
        let mut ctx = ToolContext::new()
            .with_agent(self.agent.name())
            .with_run_id(&self.run_id);
        if let Some(token) = &self.config.cancellation {
            ctx = ctx.with_cancellation(token.clone());
        }
        if let Some(events) = &self.events {
            ctx = ctx.with_events(events.clone());
        }
        ctx
    }

    /// Resolve halted content against the agent's output schema
    fn resolve_output(&self, content: &str) -> Result<AgentOutput> {
        let Some(schema) = self.agent.output_schema() else {
            return Ok(AgentOutput::FreeText(content.to_string()));
        };

        match validate_output(schema, content) {
            Ok(value) => Ok(AgentOutput::StructuredPlan(value)),
            Err(message) => match self.config.schema_policy {
                SchemaPolicy::Strict => Err(BizScoutError::SchemaViolation {
                    agent: self.agent.name().to_string(),
                    message,
                }),
                SchemaPolicy::FallbackToText => {
                    warn!(error = %message, "Output failed schema; keeping it as text");
                    Ok(AgentOutput::FreeText(content.to_string()))
                }
            },
        }
    }

    async fn fail(&mut self, emitter: &EventEmitter, err: BizScoutError) -> Result<RunOutcome> {
        self.state = MachineState::Failed;
        error!(error = %err, "Run failed");
        emitter.failed(RunFailure::from(&err)).await;
        Err(err)
    }
}

/// Parse `content` as JSON (code fences tolerated) and validate it against
/// `schema`. Errors are joined into one message.
pub fn validate_output(schema: &Value, content: &str) -> std::result::Result<Value, String> {
    let value = JsonParser::new()
        .parse(content)
        .map_err(|e| format!("output is not valid JSON: {}", e))?;

    let validator =
        jsonschema::validator_for(schema).map_err(|e| format!("invalid output schema: {}", e))?;

    let errors: Vec<String> = validator
        .iter_errors(&value)
        .map(|e| {
            let path = e.instance_path.to_string();
            let path = if path.is_empty() { "$".to_string() } else { path };
            format!("{}: {}", path, e)
        })
        .collect();

    if errors.is_empty() {
        Ok(value)
    } else {
        Err(errors.join("; "))
    }
}
