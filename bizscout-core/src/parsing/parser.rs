//! Core parser trait and error types

use thiserror::Error;

/// Error type for parsing operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Empty input
    #[error("Empty input")]
    EmptyInput,

    /// No JSON value could be located in the text
    #[error("No JSON found in output")]
    NotFound,

    /// Invalid format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Trait for output parsers
pub trait OutputParser: Send + Sync {
    /// The output type produced by this parser
    type Output;

    /// Parse the raw output string
    fn parse(&self, raw: &str) -> ParseResult<Self::Output>;

    /// Check if this parser can handle the input
    fn can_parse(&self, raw: &str) -> bool;

    /// Get the parser name for debugging
    fn name(&self) -> &'static str;
}

/// Configuration for parser behavior
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Strip markdown code fences
    pub strip_code_fences: bool,
    /// Look for a JSON value embedded in surrounding prose
    pub extract_embedded: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            strip_code_fences: true,
            extract_embedded: true,
        }
    }
}

impl ParserConfig {
    /// Only accept input that is a JSON document once trimmed
    pub fn exact() -> Self {
        Self {
            strip_code_fences: false,
            extract_embedded: false,
        }
    }
}
