//! Web search backends
//!
//! Search is only ever reached through [`crate::tools::WebSearchTool`]; the
//! providers here turn a query into a block of text the model can read.

#[cfg(feature = "search-serpapi")]
mod serpapi;
#[cfg(feature = "search-tavily")]
mod tavily;

#[cfg(feature = "search-serpapi")]
pub use serpapi::SerpApiProvider;
#[cfg(feature = "search-tavily")]
pub use tavily::TavilyProvider;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{SearchConfig, SearchProviderKind};
use crate::error::{BizScoutError, Result};

/// A web search backend
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a query and return the results flattened to text
    async fn search(&self, query: &str) -> Result<String>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

/// Build the configured search backend.
///
/// Returns `Ok(None)` when search is disabled.
pub fn create_search_provider(config: &SearchConfig) -> Result<Option<Arc<dyn SearchProvider>>> {
    match config.provider {
        SearchProviderKind::Disabled => Ok(None),

        #[cfg(feature = "search-tavily")]
        SearchProviderKind::Tavily => {
            let provider = match &config.api_key {
                Some(key) => TavilyProvider::new(key.clone()),
                None => TavilyProvider::from_env()?,
            }
            .with_max_results(config.max_results);
            let provider = match &config.topic {
                Some(topic) => provider.with_topic(topic.clone()),
                None => provider,
            };
            Ok(Some(Arc::new(provider)))
        }

        #[cfg(not(feature = "search-tavily"))]
        SearchProviderKind::Tavily => Err(BizScoutError::Configuration(
            "Tavily search requires the 'search-tavily' feature".to_string(),
        )),

        #[cfg(feature = "search-serpapi")]
        SearchProviderKind::SerpApi => {
            let provider = match &config.api_key {
                Some(key) => SerpApiProvider::new(key.clone()),
                None => SerpApiProvider::from_env()?,
            }
            .with_max_results(config.max_results);
            Ok(Some(Arc::new(provider)))
        }

        #[cfg(not(feature = "search-serpapi"))]
        SearchProviderKind::SerpApi => Err(BizScoutError::Configuration(
            "SerpAPI search requires the 'search-serpapi' feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_search_builds_nothing() {
        let config = SearchConfig {
            provider: SearchProviderKind::Disabled,
            ..Default::default()
        };
        assert!(create_search_provider(&config).unwrap().is_none());
    }

    #[cfg(feature = "search-tavily")]
    #[test]
    fn test_tavily_with_explicit_key() {
        let config = SearchConfig {
            provider: SearchProviderKind::Tavily,
            api_key: Some("tvly-test".to_string()),
            ..Default::default()
        };
        let provider = create_search_provider(&config).unwrap().unwrap();
        assert_eq!(provider.name(), "tavily");
    }
}
