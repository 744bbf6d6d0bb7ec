//! Similarity store trait for long-term conversational memory
//!
//! A store keeps past exchanges as [`Document`]s and returns the ones most
//! similar to a query. Results are only ever turned into context text for
//! a turn's instructions (see [`build_context`]).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Separator placed between documents in built context text
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// A stored piece of text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier
    pub id: String,

    /// Text that is matched and returned
    pub page_content: String,

    /// Additional properties as JSON
    #[serde(default)]
    pub metadata: serde_json::Value,

    pub created_at: DateTime<Utc>,

    /// Relevance score, set on search results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Document {
    /// Create a document with a fresh id
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            page_content: page_content.into(),
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
            score: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Document recording one user/assistant exchange
    pub fn exchange(user: &str, assistant: &str) -> Self {
        Self::new(format!("User: {}\nAssistant: {}", user, assistant))
    }
}

/// Pluggable similarity search over stored documents
#[async_trait]
pub trait SimilarityStore: Send + Sync {
    /// Return up to `k` documents most similar to `query`, best first
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>>;

    /// Add documents, returning their ids
    async fn add_documents(&self, documents: Vec<Document>) -> Result<Vec<String>>;
}

/// Join page contents into a single context block
pub fn build_context(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| d.page_content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_context_joins_with_separator() {
        let docs = vec![Document::new("first"), Document::new("second")];
        assert_eq!(build_context(&docs), "first\n---\nsecond");
        assert_eq!(build_context(&[]), "");
    }

    #[test]
    fn test_exchange_document_format() {
        let doc = Document::exchange("Is the cafe market growing?", "Yes, about 5% a year.");
        assert_eq!(
            doc.page_content,
            "User: Is the cafe market growing?\nAssistant: Yes, about 5% a year."
        );
    }
}
