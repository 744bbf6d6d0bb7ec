//! Factory for creating LLM providers from configuration

use crate::config::{LLMProvider as LLMProviderType, LLMProviderConfig};
use crate::error::Result;
use crate::llm::LLMProvider;
use std::sync::Arc;

#[cfg(feature = "llm-openai")]
use crate::llm::providers::openai::OpenAIProvider;

#[cfg(feature = "llm-gemini")]
use crate::llm::providers::gemini::GeminiProvider;

/// Factory for creating LLM providers
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration
    ///
    /// An `api_key` in the configuration wins over the provider's
    /// conventional environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be created (e.g., missing API key)
    pub fn create(config: &LLMProviderConfig) -> Result<Arc<dyn LLMProvider>> {
        let model = if config.model.is_empty() {
            None
        } else {
            Some(config.model.clone())
        };

        match config.provider {
            #[cfg(feature = "llm-openai")]
            LLMProviderType::OpenAI => {
                let provider = match &config.api_key {
                    Some(api_key) => {
                        let model = model
                            .or_else(|| std::env::var("OPENAI_MODEL").ok())
                            .unwrap_or_else(|| "gpt-4o-mini".to_string());
                        match &config.base_url {
                            Some(base_url) => OpenAIProvider::with_base_url(
                                api_key.clone(),
                                model,
                                base_url.clone(),
                            ),
                            None => OpenAIProvider::new(api_key.clone(), model),
                        }
                    }
                    None => OpenAIProvider::from_env(model)?,
                };
                Ok(Arc::new(provider))
            }

            #[cfg(feature = "llm-openai")]
            LLMProviderType::Ollama => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434/v1".to_string());
                // Ollama ignores the key but the header must be present
                let api_key = config.api_key.clone().unwrap_or_else(|| "ollama".to_string());
                Ok(Arc::new(OpenAIProvider::with_base_url(
                    api_key,
                    model.unwrap_or_else(|| "llama3.1".to_string()),
                    base_url,
                )))
            }

            #[cfg(feature = "llm-openai")]
            LLMProviderType::Groq => {
                let api_key = match &config.api_key {
                    Some(key) => key.clone(),
                    None => std::env::var("GROQ_API_KEY").map_err(|_| {
                        crate::error::BizScoutError::Configuration(
                            "GROQ_API_KEY environment variable not set".to_string(),
                        )
                    })?,
                };
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "https://api.groq.com/openai/v1".to_string());
                Ok(Arc::new(OpenAIProvider::with_base_url(
                    api_key,
                    model.unwrap_or_else(|| "llama-3.3-70b-versatile".to_string()),
                    base_url,
                )))
            }

            #[cfg(not(feature = "llm-openai"))]
            LLMProviderType::OpenAI | LLMProviderType::Ollama | LLMProviderType::Groq => {
                Err(crate::error::BizScoutError::Configuration(
                    "OpenAI-compatible providers require the 'llm-openai' feature".to_string(),
                ))
            }

            #[cfg(feature = "llm-gemini")]
            LLMProviderType::Gemini => {
                let provider = match &config.api_key {
                    Some(api_key) => {
                        let model = model
                            .or_else(|| std::env::var("GEMINI_MODEL").ok())
                            .unwrap_or_else(|| "gemini-1.5-flash".to_string());
                        match &config.base_url {
                            Some(base_url) => GeminiProvider::with_base_url(
                                api_key.clone(),
                                model,
                                base_url.clone(),
                            ),
                            None => GeminiProvider::new(api_key.clone(), model),
                        }
                    }
                    None => GeminiProvider::from_env(model)?,
                };
                Ok(Arc::new(provider))
            }

            #[cfg(not(feature = "llm-gemini"))]
            LLMProviderType::Gemini => Err(crate::error::BizScoutError::Configuration(
                "Gemini provider requires 'llm-gemini' feature".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "llm-openai")]
    #[test]
    fn test_create_openai_with_explicit_key() {
        let config = LLMProviderConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };

        let provider = LLMProviderFactory::create(&config).unwrap();
        let info = provider.model_info();
        assert_eq!(info.provider, "openai");
        assert_eq!(info.model_name, "gpt-4o-mini");
    }

    #[cfg(feature = "llm-openai")]
    #[test]
    fn test_create_ollama_needs_no_key() {
        let config = LLMProviderConfig {
            provider: LLMProviderType::Ollama,
            model: String::new(),
            ..Default::default()
        };

        let provider = LLMProviderFactory::create(&config).unwrap();
        assert_eq!(provider.model_info().model_name, "llama3.1");
    }

    #[cfg(not(feature = "llm-gemini"))]
    #[test]
    fn test_gemini_requires_feature() {
        let config = LLMProviderConfig {
            provider: LLMProviderType::Gemini,
            api_key: Some("key".to_string()),
            ..Default::default()
        };

        assert!(LLMProviderFactory::create(&config).is_err());
    }
}
