//! In-memory similarity store with simple keyword scoring
//!
//! Useful for tests and single-process chat sessions that do not need
//! persistence.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{Document, SimilarityStore};
use crate::error::Result;

/// In-memory store keyed by document id
#[derive(Default)]
pub struct InMemoryStore {
    documents: RwLock<HashMap<String, Document>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Remove every document
    pub async fn clear(&self) {
        self.documents.write().await.clear();
    }

    /// Fraction of query terms that appear in the content
    fn score_match(content: &str, query: &str) -> f64 {
        let content_lower = content.to_lowercase();
        let query_lower = query.to_lowercase();
        let query_terms: Vec<&str> = query_lower.split_whitespace().collect();

        if query_terms.is_empty() {
            return 0.0;
        }

        let matches = query_terms
            .iter()
            .filter(|term| content_lower.contains(*term))
            .count();

        matches as f64 / query_terms.len() as f64
    }
}

#[async_trait]
impl SimilarityStore for InMemoryStore {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        let documents = self.documents.read().await;

        let mut scored: Vec<(f64, Document)> = documents
            .values()
            .map(|d| (Self::score_match(&d.page_content, query), d))
            .filter(|(score, _)| *score > 0.0)
            .map(|(score, d)| {
                let mut doc = d.clone();
                doc.score = Some(score);
                (score, doc)
            })
            .collect();

        // Newest first among equal scores
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.1.created_at.cmp(&a.1.created_at))
        });

        Ok(scored.into_iter().take(k).map(|(_, d)| d).collect())
    }

    async fn add_documents(&self, documents: Vec<Document>) -> Result<Vec<String>> {
        let mut store = self.documents.write().await;
        let ids = documents.iter().map(|d| d.id.clone()).collect();
        for document in documents {
            store.insert(document.id.clone(), document);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_search() {
        let store = InMemoryStore::new();
        store
            .add_documents(vec![
                Document::new("The sky is blue"),
                Document::new("The grass is green"),
                Document::new("Water is wet"),
            ])
            .await
            .unwrap();

        let results = store.similarity_search("sky blue", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].page_content.contains("sky"));
        assert_eq!(results[0].score, Some(1.0));
    }

    #[tokio::test]
    async fn test_search_respects_k_and_ranking() {
        let store = InMemoryStore::new();
        store
            .add_documents(vec![
                Document::new("coffee shop pricing in Pune"),
                Document::new("coffee supply chain"),
                Document::new("coffee shop competitors in Pune"),
            ])
            .await
            .unwrap();

        let results = store
            .similarity_search("coffee shop Pune", 2)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|d| d.page_content.contains("Pune")));
    }

    #[tokio::test]
    async fn test_empty_query_matches_nothing() {
        let store = InMemoryStore::new();
        store
            .add_documents(vec![Document::new("anything")])
            .await
            .unwrap();

        assert!(store.similarity_search("   ", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear() {
        let store = InMemoryStore::new();
        store
            .add_documents(vec![Document::new("one"), Document::new("two")])
            .await
            .unwrap();
        assert_eq!(store.len().await, 2);

        store.clear().await;
        assert!(store.is_empty().await);
    }
}
