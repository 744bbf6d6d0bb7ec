//! Facts collected during research

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Source recorded when a fact is saved without one
pub const DEFAULT_FACT_SOURCE: &str = "Not specified";

/// A fact saved by the `save_important_fact` tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedFact {
    pub fact: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl CollectedFact {
    /// Create a fact stamped now; a missing or blank source becomes [`DEFAULT_FACT_SOURCE`]
    pub fn new(fact: impl Into<String>, source: Option<String>) -> Self {
        let source = source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_FACT_SOURCE.to_string());

        Self {
            fact: fact.into(),
            source,
            timestamp: Utc::now(),
        }
    }

    /// Local wall-clock time as `HH:MM:SS`
    pub fn display_time(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%H:%M:%S")
            .to_string()
    }
}

impl std::fmt::Display for CollectedFact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} (source: {})", self.display_time(), self.fact, self.source)
    }
}
