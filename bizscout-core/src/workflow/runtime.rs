//! Shared run wiring
//!
//! [`AgentRuntime`] holds the pieces every run of every agent shares (the
//! turn executor, the tool dispatcher, limits and the event channel) and
//! builds a fresh [`ConversationMachine`] per run.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::executor::{TurnConfig, TurnExecutor};
use super::machine::{ConversationMachine, MachineConfig, RunOutcome};
use crate::agent::AgentSpec;
use crate::config::BizScoutConfig;
use crate::error::Result;
use crate::events::EventSender;
use crate::llm::{LLMProvider, Message};
use crate::tools::{DispatcherConfig, ToolDispatcher, ToolRegistry};

#[derive(Debug, Clone)]
pub struct AgentRuntime {
    executor: Arc<TurnExecutor>,
    dispatcher: ToolDispatcher,
    config: MachineConfig,
    events: Option<EventSender>,
}

impl AgentRuntime {
    pub fn new(executor: Arc<TurnExecutor>, dispatcher: ToolDispatcher) -> Self {
        Self {
            executor,
            dispatcher,
            config: MachineConfig::default(),
            events: None,
        }
    }

    /// Runtime with default turn, dispatch and machine settings
    pub fn from_provider(provider: Arc<dyn LLMProvider>, registry: Arc<ToolRegistry>) -> Self {
        let executor = Arc::new(TurnExecutor::new(provider, registry.clone()));
        Self::new(executor, ToolDispatcher::new(registry))
    }

    /// Runtime configured from the `llm` and `orchestration` sections
    pub fn from_config(
        provider: Arc<dyn LLMProvider>,
        registry: Arc<ToolRegistry>,
        config: &BizScoutConfig,
    ) -> Self {
        let mut turn = TurnConfig::from_orchestration(&config.orchestration);
        turn.temperature = config.llm.temperature;
        turn.max_tokens = config.llm.max_tokens;

        let executor = Arc::new(TurnExecutor::with_config(provider, registry.clone(), turn));
        let dispatcher = ToolDispatcher::with_config(
            registry,
            DispatcherConfig::from_orchestration(&config.orchestration),
        );

        Self::new(executor, dispatcher)
            .with_config(MachineConfig::from_orchestration(&config.orchestration))
    }

    pub fn with_config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.config.cancellation = Some(token);
        self
    }

    pub fn executor(&self) -> &Arc<TurnExecutor> {
        &self.executor
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.dispatcher.registry()
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn events(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }

    /// Fresh machine for one run of `agent`
    pub fn machine(&self, agent: Arc<AgentSpec>) -> ConversationMachine {
        let machine = ConversationMachine::new(
            agent,
            self.executor.clone(),
            self.dispatcher.clone(),
            self.config.clone(),
        );
        match &self.events {
            Some(events) => machine.with_events(events.clone()),
            None => machine,
        }
    }

    /// Run `agent` once over `input`
    pub async fn run(&self, agent: Arc<AgentSpec>, input: Vec<Message>) -> Result<RunOutcome> {
        self.machine(agent).run(input).await
    }
}
