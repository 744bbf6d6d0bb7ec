//! LLM provider implementations

#[cfg(feature = "llm-openai")]
pub mod openai;

#[cfg(feature = "llm-openai")]
pub use openai::OpenAIProvider;

#[cfg(feature = "llm-gemini")]
pub mod gemini;

#[cfg(feature = "llm-gemini")]
pub use gemini::GeminiProvider;
