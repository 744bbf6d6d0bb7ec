//! Chunked transcript summaries

use tracing::warn;

use crate::llm::{LLMConfig, LLMProvider, Message, MessageRole};

/// Messages per chunk when the caller has no preference
pub const DEFAULT_CHUNK_SIZE: usize = 2;

/// Summarise a transcript a few messages at a time.
///
/// Only user messages and assistant answers with text are considered; tool
/// traffic is skipped. Each chunk is summarised in 1-2 sentences by its own
/// provider call. A failed chunk yields an `Error summarizing chunk: ...`
/// entry instead of aborting the rest.
pub async fn summarize_in_chunks(
    provider: &dyn LLMProvider,
    messages: &[Message],
    chunk_size: usize,
) -> Vec<String> {
    let chat: Vec<&Message> = messages
        .iter()
        .filter(|m| match m.role {
            MessageRole::User => true,
            MessageRole::Assistant => !m.content.is_empty(),
            _ => false,
        })
        .collect();

    let config = LLMConfig::default();
    let mut summaries = Vec::new();

    for chunk in chat.chunks(chunk_size.max(1)) {
        let prompt = format!(
            "You are a helpful AI. Summarize the following short chat exchange in 1-2 sentences:\n\n{}",
            render_chunk(chunk)
        );

        match provider.generate(&prompt, &config).await {
            Ok(text) => summaries.push(text.trim().to_string()),
            Err(e) => {
                warn!(error = %e, "Chunk summary failed");
                summaries.push(format!("Error summarizing chunk: {}", e));
            }
        }
    }

    summaries
}

fn render_chunk(chunk: &[&Message]) -> String {
    let mut text = String::new();
    for message in chunk {
        let role = if message.role == MessageRole::User {
            "User"
        } else {
            "Assistant"
        };
        text.push_str(&format!("{}: {}\n", role, message.text()));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BizScoutError;
    use crate::eval::ScriptedProvider;
    use crate::llm::ToolCall;
    use serde_json::json;

    #[tokio::test]
    async fn test_summarizes_pairs_and_skips_tool_traffic() {
        let provider = ScriptedProvider::new()
            .reply_text(" The user wants a bakery. ")
            .reply_text("Pricing was discussed.");

        let messages = vec![
            Message::user("I want to open a bakery"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::new("c1", "search", json!({"query": "bakery"}))],
            ),
            Message::tool_result("c1", "search", "results"),
            Message::assistant("Great idea!"),
            Message::user("What should I charge?"),
            Message::assistant("Around 40 rupees per item."),
        ];

        let summaries = summarize_in_chunks(&provider, &messages, DEFAULT_CHUNK_SIZE).await;

        assert_eq!(
            summaries,
            vec!["The user wants a bakery.", "Pricing was discussed."]
        );
        let first_prompt = provider.requests()[0].messages[0].text();
        assert!(first_prompt.contains("User: I want to open a bakery\nAssistant: Great idea!\n"));
        assert!(!first_prompt.contains("results"));
    }

    #[tokio::test]
    async fn test_failed_chunk_does_not_abort() {
        let provider = ScriptedProvider::new()
            .reply_error(BizScoutError::provider("quota exceeded"))
            .reply_text("Second chunk.");

        let messages = vec![
            Message::user("a"),
            Message::assistant("b"),
            Message::user("c"),
        ];

        let summaries = summarize_in_chunks(&provider, &messages, 2).await;
        assert_eq!(summaries.len(), 2);
        assert!(summaries[0].starts_with("Error summarizing chunk: "));
        assert!(summaries[0].contains("quota exceeded"));
        assert_eq!(summaries[1], "Second chunk.");
    }

    #[tokio::test]
    async fn test_empty_transcript() {
        let provider = ScriptedProvider::new();
        assert!(summarize_in_chunks(&provider, &[], 2).await.is_empty());
        assert_eq!(provider.call_count(), 0);
    }
}
