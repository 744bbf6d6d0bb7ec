//! Turn executor
//!
//! One call to the LLM provider per invocation. The executor never touches
//! the conversation log; it returns the reply and the state machine decides
//! what to do with it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::OrchestrationConfig;
use crate::error::{BizScoutError, Result};
use crate::llm::{CompletionRequest, LLMProvider, Message, MessageRole};
use crate::tools::ToolRegistry;

/// Settings for a turn
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Upper bound on one provider call
    pub turn_timeout: Duration,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            turn_timeout: Duration::from_secs(60),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl TurnConfig {
    pub fn from_orchestration(config: &OrchestrationConfig) -> Self {
        Self {
            turn_timeout: config.turn_timeout,
            ..Default::default()
        }
    }

    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Calls the provider once per turn
#[derive(Clone)]
pub struct TurnExecutor {
    provider: Arc<dyn LLMProvider>,
    registry: Arc<ToolRegistry>,
    config: TurnConfig,
}

impl std::fmt::Debug for TurnExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnExecutor")
            .field("model", &self.provider.model_info().model_name)
            .field("config", &self.config)
            .finish()
    }
}

impl TurnExecutor {
    pub fn new(provider: Arc<dyn LLMProvider>, registry: Arc<ToolRegistry>) -> Self {
        Self::with_config(provider, registry, TurnConfig::default())
    }

    pub fn with_config(
        provider: Arc<dyn LLMProvider>,
        registry: Arc<ToolRegistry>,
        config: TurnConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            config,
        }
    }

    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &TurnConfig {
        &self.config
    }

    /// Build the request for one turn.
    ///
    /// The log is sent in full, preceded by a system message carrying the
    /// instructions when they are non-empty. Tool names that are not
    /// registered are left out.
    pub fn build_request(
        &self,
        log: &[Message],
        instructions: &str,
        available_tools: &[String],
        response_schema: Option<&serde_json::Value>,
    ) -> CompletionRequest {
        let mut messages = Vec::with_capacity(log.len() + 1);
        if !instructions.trim().is_empty() {
            messages.push(Message::system(instructions));
        }
        messages.extend_from_slice(log);

        let (tools, missing) = self
            .registry
            .definitions(available_tools.iter().map(String::as_str));
        for name in &missing {
            warn!(tool = %name, "Agent lists a tool that is not registered; skipping");
        }

        let mut request = CompletionRequest {
            messages,
            tools,
            temperature: None,
            max_tokens: self.config.max_tokens,
            response_schema: response_schema.cloned(),
        };
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }
        request
    }

    /// Run one turn and return the assistant reply
    pub async fn execute(
        &self,
        log: &[Message],
        instructions: &str,
        available_tools: &[String],
    ) -> Result<Message> {
        let request = self.build_request(log, instructions, available_tools, None);
        self.send(request).await
    }

    /// Run one turn with a response schema hint for providers that support it
    pub async fn execute_with_schema(
        &self,
        log: &[Message],
        instructions: &str,
        available_tools: &[String],
        response_schema: Option<&serde_json::Value>,
    ) -> Result<Message> {
        let request = self.build_request(log, instructions, available_tools, response_schema);
        self.send(request).await
    }

    async fn send(&self, request: CompletionRequest) -> Result<Message> {
        debug!(
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Calling provider"
        );

        let response = tokio::time::timeout(self.config.turn_timeout, self.provider.complete(&request))
            .await
            .map_err(|_| {
                BizScoutError::provider_transient(format!(
                    "Provider did not answer within {:?}",
                    self.config.turn_timeout
                ))
            })??;

        if response.message.role != MessageRole::Assistant {
            return Err(BizScoutError::provider(format!(
                "Provider returned a {:?} message instead of an assistant reply",
                response.message.role
            )));
        }

        if let Some(usage) = response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Provider usage"
            );
        }

        Ok(response.message)
    }
}
