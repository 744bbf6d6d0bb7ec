//! Chat session
//!
//! A [`Session`] is the caller-owned state of an interactive conversation:
//! the accumulated log, the user/assistant exchanges, facts collected by
//! tools, and an optional long-term memory store. Each `ask*` call runs one
//! agent over the session and appends the result.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::fact::CollectedFact;
use crate::agent::AgentSpec;
use crate::error::{BizScoutError, Result};
use crate::events::{event_channel, EventReceiver, EventSender, RunEvent};
use crate::llm::Message;
use crate::memory::{build_context, Document, SimilarityStore};
use crate::workflow::AgentRuntime;

/// Similar documents fetched per turn when none is configured
pub const DEFAULT_MEMORY_K: usize = 5;

const SESSION_EVENT_BUFFER: usize = 64;

/// One user question and the assistant's final answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

/// State of one chat conversation
pub struct Session {
    id: String,
    log: Vec<Message>,
    exchanges: Vec<Exchange>,
    facts: Vec<CollectedFact>,
    memory: Option<Arc<dyn SimilarityStore>>,
    memory_k: usize,
    created_at: DateTime<Utc>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("messages", &self.log.len())
            .field("exchanges", &self.exchanges.len())
            .field("facts", &self.facts.len())
            .field("has_memory", &self.memory.is_some())
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// New session with a random 16-character id
    pub fn new() -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string()[..16].to_string();
        Self::with_id(id)
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            log: Vec::new(),
            exchanges: Vec::new(),
            facts: Vec::new(),
            memory: None,
            memory_k: DEFAULT_MEMORY_K,
            created_at: Utc::now(),
        }
    }

    /// Attach a long-term memory store
    pub fn with_memory(mut self, store: Arc<dyn SimilarityStore>) -> Self {
        self.memory = Some(store);
        self
    }

    pub fn with_memory_k(mut self, k: usize) -> Self {
        self.memory_k = k;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn log(&self) -> &[Message] {
        &self.log
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn facts(&self) -> &[CollectedFact] {
        &self.facts
    }

    pub fn memory(&self) -> Option<&Arc<dyn SimilarityStore>> {
        self.memory.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Forget the conversation; the memory store is left untouched
    pub fn clear(&mut self) {
        self.log.clear();
        self.exchanges.clear();
        self.facts.clear();
    }

    /// The last `n` exchanges rendered as `User: ...\nAssistant: ...` lines
    pub fn recent_context(&self, n: usize) -> String {
        let start = self.exchanges.len().saturating_sub(n);
        self.exchanges[start..]
            .iter()
            .map(|e| format!("User: {}\nAssistant: {}", e.user, e.assistant))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Ask with the whole session log as context
    pub async fn ask(
        &mut self,
        runtime: &AgentRuntime,
        agent: &Arc<AgentSpec>,
        input: &str,
    ) -> Result<String> {
        self.run_turn(runtime, agent, input, None, true).await
    }

    /// Ask with only the last `n` exchanges as context.
    ///
    /// The provider sees the new question plus a rendered summary of recent
    /// exchanges in the instructions; the session log still records
    /// everything.
    pub async fn ask_with_recent_context(
        &mut self,
        runtime: &AgentRuntime,
        agent: &Arc<AgentSpec>,
        input: &str,
        n: usize,
    ) -> Result<String> {
        let recent = self.recent_context(n);
        let section = if recent.is_empty() {
            None
        } else {
            Some(format!("Recent conversation:\n{}", recent))
        };
        self.run_turn(runtime, agent, input, section, false).await
    }

    /// Ask with similar past exchanges from the memory store as context.
    ///
    /// Fetches up to `k` documents similar to `input`, appends them to the
    /// agent's instructions as long-term context, runs the turn, then stores
    /// the new exchange in the store.
    pub async fn ask_with_memory(
        &mut self,
        runtime: &AgentRuntime,
        agent: &Arc<AgentSpec>,
        input: &str,
    ) -> Result<String> {
        let store = self.memory.clone().ok_or_else(|| {
            BizScoutError::Configuration("Session has no memory store".to_string())
        })?;

        let documents = store.similarity_search(input, self.memory_k).await?;
        debug!(session = %self.id, documents = documents.len(), "Loaded long-term context");
        let section = if documents.is_empty() {
            None
        } else {
            Some(format!("Long-term context:\n{}", build_context(&documents)))
        };

        let answer = self.run_turn(runtime, agent, input, section, true).await?;
        store
            .add_documents(vec![Document::exchange(input, &answer)])
            .await?;
        Ok(answer)
    }

    async fn run_turn(
        &mut self,
        runtime: &AgentRuntime,
        agent: &Arc<AgentSpec>,
        input: &str,
        context: Option<String>,
        include_log: bool,
    ) -> Result<String> {
        let agent = match context {
            Some(section) => Arc::new(agent.with_appended_instructions(&section)),
            None => agent.clone(),
        };

        let mut seed = if include_log {
            self.log.clone()
        } else {
            Vec::new()
        };
        seed.push(Message::user(input));

        let (tx, rx) = event_channel(SESSION_EVENT_BUFFER);
        let machine = runtime.machine(agent).with_events(tx);
        let run = async move {
            let mut machine = machine;
            machine.run(seed).await
        };

        // Events are forwarded even when the run fails; facts are kept only on success
        let (result, facts) = tokio::join!(run, drain_events(rx, runtime.events().cloned()));
        let outcome = result?;
        self.facts.extend(facts);

        let answer = outcome.output.as_text();
        if include_log {
            self.log = outcome.log;
        } else {
            self.log.extend(outcome.log);
        }
        self.exchanges.push(Exchange {
            user: input.to_string(),
            assistant: answer.clone(),
        });

        Ok(answer)
    }
}

/// Collect facts from a run's events, forwarding every event downstream
async fn drain_events(mut rx: EventReceiver, forward: Option<EventSender>) -> Vec<CollectedFact> {
    let mut facts = Vec::new();
    while let Some(event) = rx.recv().await {
        if let RunEvent::FactCollected { fact, .. } = &event {
            facts.push(fact.clone());
        }
        if let Some(forward) = &forward {
            let _ = forward.send(event).await;
        }
    }
    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::ScriptedProvider;
    use crate::llm::{MessageRole, ToolCall};
    use crate::memory::InMemoryStore;
    use crate::tools::{SaveFactTool, ToolRegistry};
    use serde_json::json;

    fn runtime(provider: ScriptedProvider) -> (Arc<ScriptedProvider>, AgentRuntime) {
        let provider = Arc::new(provider);
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SaveFactTool::new())).unwrap();
        let runtime = AgentRuntime::from_provider(provider.clone(), Arc::new(registry));
        (provider, runtime)
    }

    fn assistant() -> Arc<AgentSpec> {
        Arc::new(
            AgentSpec::builder("BizAI")
                .instructions("Help the user plan a business.")
                .tool("save_important_fact")
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_ask_appends_to_log_and_collects_facts() {
        let (provider, runtime) = runtime(
            ScriptedProvider::new()
                .reply_tool_calls(vec![ToolCall::new(
                    "c1",
                    "save_important_fact",
                    json!({"fact": "Rent in Agra is low"}),
                )])
                .reply_text("Agra looks promising.")
                .reply_text("Start with a kiosk."),
        );
        let mut session = Session::with_id("s1");

        let first = session
            .ask(&runtime, &assistant(), "Where should I open a cafe?")
            .await
            .unwrap();
        assert_eq!(first, "Agra looks promising.");
        assert_eq!(session.log().len(), 4);
        assert_eq!(session.facts().len(), 1);
        assert_eq!(session.facts()[0].source, "Not specified");

        let first_log = session.log().to_vec();
        session
            .ask(&runtime, &assistant(), "How big?")
            .await
            .unwrap();
        assert_eq!(&session.log()[..first_log.len()], first_log.as_slice());
        assert_eq!(session.exchanges().len(), 2);

        // Second run saw the whole prior log plus the new question
        let requests = provider.requests();
        assert_eq!(requests[2].messages.len(), 1 + 4 + 1);
    }

    #[tokio::test]
    async fn test_failed_ask_leaves_log_untouched() {
        let (_, runtime) = runtime(
            ScriptedProvider::new().reply_error(BizScoutError::provider_status(503, "down")),
        );
        let mut session = Session::new();

        let err = session
            .ask(&runtime, &assistant(), "hello")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(session.log().is_empty());
        assert!(session.exchanges().is_empty());
    }

    #[tokio::test]
    async fn test_failed_ask_drops_facts_but_forwards_events() {
        let (_, runtime) = runtime(
            ScriptedProvider::new()
                .reply_tool_calls(vec![ToolCall::new(
                    "c1",
                    "save_important_fact",
                    json!({"fact": "Rent in Agra is low", "source": "MagicBricks"}),
                )])
                .reply_error(BizScoutError::provider_status(503, "down")),
        );
        let (tx, mut rx) = event_channel(64);
        let runtime = runtime.with_events(tx);
        let mut session = Session::new();

        let err = session
            .ask(&runtime, &assistant(), "Where should I open a cafe?")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(session.facts().is_empty());
        assert!(session.log().is_empty());
        assert!(session.exchanges().is_empty());

        drop(runtime);
        let mut forwarded = Vec::new();
        while let Some(event) = rx.recv().await {
            if let RunEvent::FactCollected { fact, .. } = event {
                forwarded.push(fact);
            }
        }
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].source, "MagicBricks");
    }

    #[tokio::test]
    async fn test_ask_with_memory_injects_and_stores() {
        let store = Arc::new(InMemoryStore::new());
        store
            .add_documents(vec![Document::exchange(
                "My bakery is called Crumbs",
                "Nice name!",
            )])
            .await
            .unwrap();

        let (provider, runtime) = runtime(ScriptedProvider::new().reply_text("Crumbs can sell cakes."));
        let mut session = Session::new().with_memory(store.clone());

        let answer = session
            .ask_with_memory(&runtime, &assistant(), "What should my bakery sell?")
            .await
            .unwrap();
        assert_eq!(answer, "Crumbs can sell cakes.");

        let system = provider.requests()[0].messages[0].clone();
        assert_eq!(system.role, MessageRole::System);
        assert!(system.text().contains("Long-term context:\nUser: My bakery is called Crumbs"));

        assert_eq!(store.len().await, 2);
        let stored = store.similarity_search("sell cakes", 1).await.unwrap();
        assert_eq!(
            stored[0].page_content,
            "User: What should my bakery sell?\nAssistant: Crumbs can sell cakes."
        );
    }

    #[tokio::test]
    async fn test_ask_with_memory_requires_store() {
        let (_, runtime) = runtime(ScriptedProvider::new());
        let err = Session::new()
            .ask_with_memory(&runtime, &assistant(), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, BizScoutError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_recent_context_window() {
        let (provider, runtime) = runtime(
            ScriptedProvider::new()
                .reply_text("one")
                .reply_text("two")
                .reply_text("three"),
        );
        let mut session = Session::new();
        let agent = assistant();

        session.ask(&runtime, &agent, "q1").await.unwrap();
        session.ask(&runtime, &agent, "q2").await.unwrap();
        assert_eq!(session.recent_context(1), "User: q2\nAssistant: two");
        assert_eq!(
            session.recent_context(5),
            "User: q1\nAssistant: one\nUser: q2\nAssistant: two"
        );

        session
            .ask_with_recent_context(&runtime, &agent, "q3", 1)
            .await
            .unwrap();
        let request = &provider.requests()[2];
        assert_eq!(request.messages.len(), 2);
        assert!(request.messages[0]
            .text()
            .ends_with("Recent conversation:\nUser: q2\nAssistant: two"));
        assert_eq!(session.log().len(), 6);
    }

    #[tokio::test]
    async fn test_clear_keeps_id() {
        let (_, runtime) = runtime(
            ScriptedProvider::new()
                .reply_tool_calls(vec![ToolCall::new(
                    "c1",
                    "save_important_fact",
                    json!({"fact": "x"}),
                )])
                .reply_text("Noted."),
        );
        let mut session = Session::new();
        assert_eq!(session.id().len(), 16);
        let id = session.id().to_string();

        session.ask(&runtime, &assistant(), "remember x").await.unwrap();
        assert_eq!(session.facts().len(), 1);

        session.clear();
        assert!(session.facts().is_empty());
        assert!(session.log().is_empty());
        assert_eq!(session.id(), id);
    }
}
