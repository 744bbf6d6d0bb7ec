//! Structured output parsing
//!
//! Locates the JSON value in a model's final answer so it can be validated
//! against an agent's output schema or read as a routing decision.
//!
//! # Example
//!
//! ```rust,ignore
//! use bizscout_core::parsing::{JsonParser, OutputParser};
//!
//! let parser = JsonParser::new();
//! let result = parser.parse("```json\n{\"key\": \"value\"}\n```")?;
//! assert_eq!(result["key"], "value");
//! ```

mod json;
mod parser;

pub use json::{extract_json, strip_code_fences, JsonParser};
pub use parser::{OutputParser, ParseError, ParseResult, ParserConfig};
