//! SerpAPI (Google results) search backend

use async_trait::async_trait;
use serde::Deserialize;

use super::SearchProvider;
use crate::error::{BizScoutError, Result};

const DEFAULT_BASE_URL: &str = "https://serpapi.com";

pub struct SerpApiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    max_results: usize,
}

impl SerpApiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_results: 5,
        }
    }

    /// Create from `SERPAPI_API_KEY`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("SERPAPI_API_KEY").map_err(|_| {
            BizScoutError::Configuration("SERPAPI_API_KEY environment variable not set".to_string())
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
}

#[derive(Deserialize)]
struct SerpResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    answer_box: Option<AnswerBox>,
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Deserialize)]
struct AnswerBox {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

#[derive(Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: Option<String>,
}

/// Answer box first, then the organic results as title/link/snippet blocks
fn render(response: SerpResponse, max_results: usize) -> String {
    let mut sections = Vec::new();

    if let Some(answer_box) = response.answer_box {
        if let Some(text) = answer_box.answer.or(answer_box.snippet) {
            sections.push(format!("Answer: {}", text));
        }
    }

    for result in response.organic_results.into_iter().take(max_results) {
        let mut block = format!("{}\n{}", result.title, result.link);
        if let Some(snippet) = result.snippet {
            block.push('\n');
            block.push_str(&snippet);
        }
        sections.push(block);
    }

    if sections.is_empty() {
        return "No good search result found".to_string();
    }
    sections.join("\n\n")
}

#[async_trait]
impl SearchProvider for SerpApiProvider {
    async fn search(&self, query: &str) -> Result<String> {
        let num = self.max_results.to_string();
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BizScoutError::Search(format!("Failed to reach SerpAPI: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BizScoutError::Search(format!(
                "SerpAPI error ({}): {}",
                status, text
            )));
        }

        let body: SerpResponse = response
            .json()
            .await
            .map_err(|e| BizScoutError::Search(format!("Failed to parse SerpAPI response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(BizScoutError::Search(format!("SerpAPI error: {}", error)));
        }

        Ok(render(body, self.max_results))
    }

    fn name(&self) -> &str {
        "serpapi"
    }
}
