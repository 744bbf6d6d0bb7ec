//! Run event protocol
//!
//! Runs report progress over an mpsc channel instead of being polled.
//! Events are emitted at turn, tool and hand-off boundaries, and tools push
//! side-channel data (collected facts) through the same channel.
//!
//! The receiver must be drained: a full channel applies backpressure to the
//! run that is emitting.
//!
//! # Example
//!
//! ```rust,ignore
//! use bizscout_core::events::{event_channel, RunEvent};
//!
//! let (tx, mut rx) = event_channel(64);
//!
//! tokio::spawn(async move {
//!     while let Some(event) = rx.recv().await {
//!         if let RunEvent::FactCollected { fact, .. } = event {
//!             println!("{} ({})", fact.fact, fact.source);
//!         }
//!     }
//! });
//!
//! let machine = ConversationMachine::new(agent, executor, dispatcher, config)
//!     .with_events(tx);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::conversation::CollectedFact;
use crate::error::RunFailure;
use crate::llm::{Message, ToolCall};

/// Events emitted while a run is in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// A state machine started for an agent
    RunStarted {
        run_id: String,
        agent: String,
        timestamp: DateTime<Utc>,
    },

    /// The turn executor is about to call the provider
    TurnStarted {
        run_id: String,
        agent: String,
        /// 1-based turn number
        turn: usize,
    },

    /// A message was appended to the run's log
    MessageAppended {
        run_id: String,
        agent: String,
        /// Position of the message in the log
        index: usize,
        message: Message,
    },

    /// The model asked for tools
    ToolCallsRequested {
        run_id: String,
        agent: String,
        calls: Vec<ToolCall>,
    },

    /// One tool call finished
    ToolCompleted {
        run_id: String,
        agent: String,
        call_id: String,
        tool_name: String,
        success: bool,
        duration_ms: u64,
    },

    /// A tool recorded a fact for the session
    FactCollected {
        run_id: Option<String>,
        fact: CollectedFact,
    },

    /// The router moved the conversation to another agent
    Handoff {
        from: String,
        to: String,
        timestamp: DateTime<Utc>,
    },

    /// The run halted with a final answer
    Halted {
        run_id: String,
        agent: String,
        turns_taken: usize,
    },

    /// The run ended in failure
    Failed {
        run_id: String,
        agent: String,
        failure: RunFailure,
    },
}

/// Sender half of the run event channel
pub type EventSender = mpsc::Sender<RunEvent>;

/// Receiver half of the run event channel
pub type EventReceiver = mpsc::Receiver<RunEvent>;

/// Create a bounded run event channel
pub fn event_channel(buffer_size: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(buffer_size)
}

/// Helper that stamps events with a run id and tolerates a missing channel.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: Option<EventSender>,
    run_id: String,
    agent: String,
}

impl EventEmitter {
    pub fn new(sender: Option<EventSender>, run_id: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            sender,
            run_id: run_id.into(),
            agent: agent.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn sender(&self) -> Option<&EventSender> {
        self.sender.as_ref()
    }

    /// Send an event; a closed channel is ignored.
    pub async fn emit(&self, event: RunEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event).await;
        }
    }

    pub async fn run_started(&self) {
        self.emit(RunEvent::RunStarted {
            run_id: self.run_id.clone(),
            agent: self.agent.clone(),
            timestamp: Utc::now(),
        })
        .await;
    }

    pub async fn turn_started(&self, turn: usize) {
        self.emit(RunEvent::TurnStarted {
            run_id: self.run_id.clone(),
            agent: self.agent.clone(),
            turn,
        })
        .await;
    }

    pub async fn message_appended(&self, index: usize, message: &Message) {
        if self.sender.is_none() {
            return;
        }
        self.emit(RunEvent::MessageAppended {
            run_id: self.run_id.clone(),
            agent: self.agent.clone(),
            index,
            message: message.clone(),
        })
        .await;
    }

    pub async fn tool_calls_requested(&self, calls: &[ToolCall]) {
        if self.sender.is_none() {
            return;
        }
        self.emit(RunEvent::ToolCallsRequested {
            run_id: self.run_id.clone(),
            agent: self.agent.clone(),
            calls: calls.to_vec(),
        })
        .await;
    }

    pub async fn halted(&self, turns_taken: usize) {
        self.emit(RunEvent::Halted {
            run_id: self.run_id.clone(),
            agent: self.agent.clone(),
            turns_taken,
        })
        .await;
    }

    pub async fn failed(&self, failure: RunFailure) {
        self.emit(RunEvent::Failed {
            run_id: self.run_id.clone(),
            agent: self.agent.clone(),
            failure,
        })
        .await;
    }
}
