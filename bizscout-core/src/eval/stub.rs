//! Scripted provider and stub tools
//!
//! Provides stand-ins for the LLM provider and for tools that return
//! predetermined responses, enabling offline, deterministic testing of runs
//! and pipelines.

use crate::error::{BizScoutError, Result};
use crate::llm::{CompletionRequest, LLMProvider, LLMResponse, Message, ModelInfo, ToolCall};
use crate::tools::{
    Tool, ToolError, ToolErrorKind, ToolExecutionContext, ToolMetadata, ToolSchema,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::RwLock;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// LLM provider that replays a fixed script of turns.
///
/// Each `complete` call pops the next scripted reply and records the request.
/// When the script runs out, the fallback reply is returned if one was set,
/// otherwise a provider error.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Message>>>,
    fallback: Option<Message>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Queue an arbitrary reply message
    pub fn reply(self, message: Message) -> Self {
        lock(&self.script).push_back(Ok(message));
        self
    }

    /// Queue a plain assistant answer
    pub fn reply_text(self, text: impl Into<String>) -> Self {
        let text: String = text.into();
        self.reply(Message::assistant(text))
    }

    /// Queue an assistant answer whose text is the given JSON
    pub fn reply_json(self, value: Value) -> Self {
        self.reply(Message::assistant(value.to_string()))
    }

    /// Queue an assistant turn that requests tools
    pub fn reply_tool_calls(self, calls: Vec<ToolCall>) -> Self {
        self.reply(Message::assistant_with_tool_calls("", calls))
    }

    /// Queue a provider failure
    pub fn reply_error(self, error: BizScoutError) -> Self {
        lock(&self.script).push_back(Err(error));
        self
    }

    /// Reply returned for every call after the script is exhausted
    pub fn with_fallback(mut self, message: Message) -> Self {
        self.fallback = Some(message);
        self
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `complete` calls so far
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    /// Scripted replies not yet consumed
    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<LLMResponse> {
        lock(&self.requests).push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = lock(&self.script).pop_front();
        let message = match next {
            Some(reply) => reply?,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| BizScoutError::provider("scripted provider has no replies left"))?,
        };

        Ok(LLMResponse {
            message,
            usage: None,
        })
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "scripted".to_string(),
            model_name: "scripted".to_string(),
        }
    }
}

/// Predetermined response for a stub tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StubResponse {
    /// Value to return on success
    pub value: Option<Value>,

    /// Error to return on failure
    pub error: Option<StubError>,

    /// Simulated delay in milliseconds
    pub delay_ms: u64,
}

impl StubResponse {
    /// Create a successful response
    pub fn success(value: Value) -> Self {
        Self {
            value: Some(value),
            error: None,
            delay_ms: 0,
        }
    }

    /// Create an error response
    pub fn error(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            value: None,
            error: Some(StubError {
                kind,
                message: message.into(),
            }),
            delay_ms: 0,
        }
    }

    /// Add a simulated delay
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// Stub error details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StubError {
    pub kind: ToolErrorKind,
    pub message: String,
}

/// A stub tool that returns predetermined responses
pub struct StubTool {
    metadata: ToolMetadata,
    schema: ToolSchema,
    responses: Vec<StubResponse>,
    call_count: AtomicUsize,
    call_history: RwLock<Vec<Value>>,
}

impl StubTool {
    /// Create a new stub tool with a single response
    pub fn new(name: impl Into<String>, response: StubResponse) -> Self {
        Self::with_responses(name, vec![response])
    }

    /// Create a stub tool with multiple responses (returned in order, last one repeats)
    pub fn with_responses(name: impl Into<String>, responses: Vec<StubResponse>) -> Self {
        let name = name.into();
        Self {
            metadata: ToolMetadata::new(&name, format!("Stub tool: {}", name)),
            schema: ToolSchema::new(serde_json::json!({"type": "object"})),
            responses,
            call_count: AtomicUsize::new(0),
            call_history: RwLock::new(Vec::new()),
        }
    }

    /// Stub that always answers with the given text
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, StubResponse::success(Value::String(text.into())))
    }

    /// Get the number of times this tool has been called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get the call history (args passed to each call)
    pub async fn call_history(&self) -> Vec<Value> {
        self.call_history.read().await.clone()
    }

    /// Set a custom schema
    pub fn with_schema(mut self, schema: ToolSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Set custom metadata
    pub fn with_metadata(mut self, metadata: ToolMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[async_trait]
impl Tool for StubTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(
        &self,
        args: Value,
        _ctx: &ToolExecutionContext,
    ) -> std::result::Result<Value, ToolError> {
        let call_num = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.call_history.write().await.push(args);

        let response = self
            .responses
            .get(call_num)
            .or_else(|| self.responses.last())
            .cloned()
            .unwrap_or_else(|| StubResponse::success(Value::Null));

        if response.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(response.delay_ms)).await;
        }

        match response.error {
            Some(error) => Err(ToolError::new(error.kind, error.message)),
            None => Ok(response.value.unwrap_or(Value::Null)),
        }
    }
}
