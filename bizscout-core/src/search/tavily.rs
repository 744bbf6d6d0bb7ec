//! Tavily search API

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::SearchProvider;
use crate::error::{BizScoutError, Result};

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Tavily search backend
pub struct TavilyProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    max_results: usize,
    topic: Option<String>,
}

impl TavilyProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_results: 5,
            topic: None,
        }
    }

    /// Create from `TAVILY_API_KEY`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("TAVILY_API_KEY").map_err(|_| {
            BizScoutError::Configuration("TAVILY_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Restrict results to a topic ("general" or "news")
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<&'a str>,
    include_answer: bool,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

fn render(response: TavilyResponse) -> String {
    let mut sections = Vec::new();
    if let Some(answer) = response.answer.filter(|a| !a.trim().is_empty()) {
        sections.push(format!("Answer: {}", answer.trim()));
    }
    for result in response.results {
        sections.push(format!("{}\n{}\n{}", result.title, result.url, result.content.trim()));
    }
    if sections.is_empty() {
        return "No results found.".to_string();
    }
    sections.join("\n\n")
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    async fn search(&self, query: &str) -> Result<String> {
        let request = TavilyRequest {
            api_key: &self.api_key,
            query,
            max_results: self.max_results,
            topic: self.topic.as_deref(),
            include_answer: true,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| BizScoutError::Search(format!("Failed to reach Tavily: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BizScoutError::Search(format!(
                "Tavily API error ({}): {}",
                status, text
            )));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| BizScoutError::Search(format!("Failed to parse Tavily response: {}", e)))?;

        Ok(render(body))
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_answer_then_results() {
        let body: TavilyResponse = serde_json::from_str(
            r#"{
                "answer": "The market is growing.",
                "results": [
                    {"title": "Report", "url": "https://example.com/r", "content": "Up 12% in 2024 "}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(
            render(body),
            "Answer: The market is growing.\n\nReport\nhttps://example.com/r\nUp 12% in 2024"
        );
    }

    #[test]
    fn test_render_empty() {
        let body: TavilyResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert_eq!(render(body), "No results found.");
    }

    #[test]
    fn test_request_omits_missing_topic() {
        let request = TavilyRequest {
            api_key: "k",
            query: "q",
            max_results: 5,
            topic: None,
            include_answer: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("topic").is_none());
        assert_eq!(value["max_results"], 5);
    }
}
