//! Built-in tools: web search and fact saving

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::result::ToolError;
use super::tool::{Tool, ToolExecutionContext, ToolMetadata, ToolSchema};
use crate::conversation::CollectedFact;
use crate::events::RunEvent;
use crate::search::SearchProvider;

pub const SEARCH_TOOL_NAME: &str = "search";
pub const SAVE_FACT_TOOL_NAME: &str = "save_important_fact";

/// Web search through the configured backend
pub struct WebSearchTool {
    metadata: ToolMetadata,
    provider: Arc<dyn SearchProvider>,
}

impl WebSearchTool {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            metadata: ToolMetadata::new(
                SEARCH_TOOL_NAME,
                "Search the web for current information.",
            )
            .with_hint("Use for market data, competitors, prices and recent news.")
            .with_returns("Search results as text")
            .with_tag("web"),
            provider,
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query" }
            },
            "required": ["query"]
        }))
    }

    async fn execute(&self, args: Value, _ctx: &ToolExecutionContext) -> Result<Value, ToolError> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default();

        self.provider
            .search(query)
            .await
            .map(Value::String)
            .map_err(|e| {
                ToolError::transient(e.to_string()).with_code(self.provider.name().to_uppercase())
            })
    }
}

/// Records an important fact for the session.
///
/// The fact travels to the caller as a [`RunEvent::FactCollected`] on the
/// run's event channel; without a channel it is only acknowledged.
pub struct SaveFactTool {
    metadata: ToolMetadata,
}

impl Default for SaveFactTool {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveFactTool {
    pub fn new() -> Self {
        Self {
            metadata: ToolMetadata::new(
                SAVE_FACT_TOOL_NAME,
                "Save an important fact discovered during research.",
            )
            .with_hint("Include the source when you know it.")
            .with_returns("Confirmation message")
            .with_tag("session"),
        }
    }
}

#[async_trait]
impl Tool for SaveFactTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(json!({
            "type": "object",
            "properties": {
                "fact": { "type": "string", "description": "The important fact to save" },
                "source": { "type": ["string", "null"], "description": "Optional source of the fact" }
            },
            "required": ["fact"]
        }))
    }

    async fn execute(&self, args: Value, ctx: &ToolExecutionContext) -> Result<Value, ToolError> {
        let fact = args
            .get("fact")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let source = args
            .get("source")
            .and_then(Value::as_str)
            .map(str::to_string);

        let collected = CollectedFact::new(fact.clone(), source);

        if let Some(events) = &ctx.events {
            let _ = events
                .send(RunEvent::FactCollected {
                    run_id: ctx.run_id.clone(),
                    fact: collected,
                })
                .await;
        }

        Ok(Value::String(format!("Fact saved: {}", fact)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BizScoutError, Result};
    use crate::events::event_channel;
    use crate::tools::ToolErrorKind;

    struct FixedSearch(Option<&'static str>);

    #[async_trait]
    impl SearchProvider for FixedSearch {
        async fn search(&self, query: &str) -> Result<String> {
            match self.0 {
                Some(text) => Ok(format!("{}: {}", query, text)),
                None => Err(BizScoutError::Search("quota exceeded".to_string())),
            }
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_search_returns_text() {
        let tool = WebSearchTool::new(Arc::new(FixedSearch(Some("3 results"))));
        let value = tool
            .execute(json!({"query": "cafes"}), &ToolExecutionContext::new())
            .await
            .unwrap();
        assert_eq!(value, json!("cafes: 3 results"));
    }

    #[tokio::test]
    async fn test_search_failure_is_transient_tool_error() {
        let tool = WebSearchTool::new(Arc::new(FixedSearch(None)));
        let err = tool
            .execute(json!({"query": "cafes"}), &ToolExecutionContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Transient);
        assert!(err.message.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_save_fact_emits_event() {
        let (tx, mut rx) = event_channel(4);
        let ctx = ToolExecutionContext::new()
            .with_run_id("run-1")
            .with_events(tx);

        let value = SaveFactTool::new()
            .execute(
                json!({"fact": "Agra has 40 cloud kitchens", "source": "Zomato"}),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(value, json!("Fact saved: Agra has 40 cloud kitchens"));

        match rx.recv().await.unwrap() {
            RunEvent::FactCollected { run_id, fact } => {
                assert_eq!(run_id.as_deref(), Some("run-1"));
                assert_eq!(fact.fact, "Agra has 40 cloud kitchens");
                assert_eq!(fact.source, "Zomato");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_fact_without_source_or_channel() {
        let tool = SaveFactTool::new();
        assert!(tool.validate(&json!({"fact": "x", "source": null})).is_ok());
        assert!(tool.validate(&json!({"source": "y"})).is_err());

        let value = tool
            .execute(json!({"fact": "x"}), &ToolExecutionContext::new())
            .await
            .unwrap();
        assert_eq!(value, json!("Fact saved: x"));
    }
}
