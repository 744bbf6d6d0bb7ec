//! Configuration types for BizScout

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{BizScoutError, Result};
use crate::llm::RetryConfig;
use crate::workflow::SchemaPolicy;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BizScoutConfig {
    /// LLM provider configuration
    pub llm: LLMProviderConfig,

    /// Web search configuration
    pub search: SearchConfig,

    /// Control loop limits and timeouts
    pub orchestration: OrchestrationConfig,

    /// Long-term memory configuration
    pub memory: MemoryConfig,

    /// Interactive chat settings
    pub chat: ChatConfig,

    /// Caller-level retry around whole runs
    pub retry: RetryConfig,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMProviderConfig {
    /// Provider type
    pub provider: LLMProvider,

    /// Model name (empty means the provider default)
    pub model: String,

    /// API key (if needed, prefer env vars)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL (for custom endpoints, e.g., Ollama)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

impl Default for LLMProviderConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::OpenAI,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
    Gemini,
    /// OpenAI-compatible local endpoint
    Ollama,
    /// OpenAI-compatible hosted endpoint
    Groq,
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub provider: SearchProviderKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Maximum results per query
    pub max_results: usize,

    /// Search topic hint (Tavily: "general" or "news")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProviderKind::Tavily,
            api_key: None,
            max_results: 5,
            topic: None,
        }
    }
}

/// Web search backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    Tavily,
    SerpApi,
    /// No search tool is registered
    Disabled,
}

/// Control loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Maximum provider turns per run
    pub max_iterations: usize,

    /// Timeout for a single provider turn
    #[serde(with = "humantime_serde")]
    pub turn_timeout: Duration,

    /// Default timeout for a single tool invocation
    #[serde(with = "humantime_serde")]
    pub tool_timeout: Duration,

    /// Per-tool timeout overrides
    pub tool_timeouts: HashMap<String, humantime_serde::Serde<Duration>>,

    /// Run a batch of tool calls concurrently
    pub parallel_tools: bool,

    /// Capacity of the run event channel
    pub event_buffer: usize,

    /// What to do when a final answer violates the agent's output schema
    pub schema_policy: SchemaPolicy,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            turn_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(30),
            tool_timeouts: HashMap::new(),
            parallel_tools: false,
            event_buffer: 64,
            schema_policy: SchemaPolicy::Strict,
        }
    }
}

impl OrchestrationConfig {
    /// Per-tool overrides as plain durations
    pub fn tool_timeout_overrides(&self) -> HashMap<String, Duration> {
        self.tool_timeouts
            .iter()
            .map(|(name, timeout)| (name.clone(), **timeout))
            .collect()
    }
}

/// Long-term memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Inject similarity-search context into chat turns
    pub enabled: bool,

    /// Number of documents retrieved per query
    pub k: usize,

    /// Number of recent user/assistant exchanges kept as short-term context
    pub recent_turns: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            k: 5,
            recent_turns: 5,
        }
    }
}

/// Interactive chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Assistant phrase that ends the interactive loop
    pub stop_phrase: String,

    /// Instructions for the chat assistant
    pub instructions: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            stop_phrase: "market analysis summary".to_string(),
            instructions: "You are a business research assistant. Ask clarifying questions about \
                the user's business idea, use web search for current market data, and when you \
                have enough information produce a market analysis summary."
                .to_string(),
        }
    }
}

impl BizScoutConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. `bizscout.toml` in the working directory
    /// 3. File named by `BIZSCOUT_CONFIG_PATH`
    /// 4. `BIZSCOUT_*` environment variables, nested with `__`
    ///    (e.g. `BIZSCOUT_ORCHESTRATION__MAX_ITERATIONS=5`)
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration source is invalid.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(BizScoutConfig::default()))
            .merge(Toml::file("bizscout.toml"));

        if let Ok(path) = std::env::var("BIZSCOUT_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("BIZSCOUT_").split("__"));

        let config: BizScoutConfig = figment.extract().map_err(|e| {
            BizScoutError::Configuration(format!("Failed to load configuration: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let path = path.as_ref();
        if !path.exists() {
            return Err(BizScoutError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let config: BizScoutConfig = Figment::from(Serialized::defaults(BizScoutConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                BizScoutError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a limit or timeout is zero.
    pub fn validate(&self) -> Result<()> {
        let orchestration = &self.orchestration;
        if orchestration.max_iterations == 0 {
            return Err(BizScoutError::Configuration(
                "orchestration.max_iterations must be at least 1".to_string(),
            ));
        }
        if orchestration.turn_timeout.is_zero() || orchestration.tool_timeout.is_zero() {
            return Err(BizScoutError::Configuration(
                "orchestration timeouts must be non-zero".to_string(),
            ));
        }
        if orchestration.event_buffer == 0 {
            return Err(BizScoutError::Configuration(
                "orchestration.event_buffer must be at least 1".to_string(),
            ));
        }
        if self.memory.k == 0 {
            return Err(BizScoutError::Configuration(
                "memory.k must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(BizScoutError::Configuration(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.search.max_results == 0 {
            return Err(BizScoutError::Configuration(
                "search.max_results must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
