//! JSON extraction from model output
//!
//! Models often wrap structured answers in a ```json fence or a sentence of
//! preamble. The parser tolerates both but never rewrites the JSON itself.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use super::parser::{OutputParser, ParseError, ParseResult, ParserConfig};

static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json|JSON)?\s*\n?([\s\S]*?)\n?```").unwrap());

/// JSON parser for agent output
#[derive(Debug, Clone, Default)]
pub struct JsonParser {
    config: ParserConfig,
}

impl JsonParser {
    /// Create a new JSON parser with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Only accept a bare JSON document
    pub fn exact() -> Self {
        Self::with_config(ParserConfig::exact())
    }
}

/// Content of the first markdown code fence, if any
pub fn strip_code_fences(input: &str) -> Option<&str> {
    CODE_FENCE_RE
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Locate the first balanced JSON object or array in surrounding text
pub fn extract_json(input: &str) -> Option<&str> {
    let start_obj = input.find('{');
    let start_arr = input.find('[');

    let (start, end_char) = match (start_obj, start_arr) {
        (Some(o), Some(a)) if o < a => (o, '}'),
        (Some(_), Some(a)) => (a, ']'),
        (Some(o), None) => (o, '}'),
        (None, Some(a)) => (a, ']'),
        (None, None) => return None,
    };

    let substring = &input[start..];
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in substring.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth -= 1;
                if depth == 0 && c == end_char {
                    return Some(&substring[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

impl OutputParser for JsonParser {
    type Output = Value;

    fn parse(&self, raw: &str) -> ParseResult<Self::Output> {
        let input = raw.trim();
        if input.is_empty() {
            return Err(ParseError::EmptyInput);
        }

        let direct_error = match serde_json::from_str::<Value>(input) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if self.config.strip_code_fences {
            if let Some(fenced) = strip_code_fences(input) {
                return serde_json::from_str(fenced.trim())
                    .map_err(|e| ParseError::InvalidFormat(e.to_string()));
            }
        }

        if self.config.extract_embedded {
            return match extract_json(input) {
                Some(embedded) => serde_json::from_str(embedded)
                    .map_err(|e| ParseError::InvalidFormat(e.to_string())),
                None => Err(ParseError::NotFound),
            };
        }

        Err(ParseError::InvalidFormat(direct_error.to_string()))
    }

    fn can_parse(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        trimmed.starts_with('{')
            || trimmed.starts_with('[')
            || trimmed.contains("```json")
            || trimmed.contains("```JSON")
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
