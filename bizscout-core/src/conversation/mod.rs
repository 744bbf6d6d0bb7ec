//! Conversation state owned by the caller
//!
//! - [`Session`]: the log, exchanges and facts of one chat, plus optional
//!   long-term memory
//! - [`CollectedFact`]: facts tools save during a run
//! - [`summarize_in_chunks`]: short summaries of a transcript
//!
//! # Example
//!
//! ```rust,ignore
//! use bizscout_core::conversation::Session;
//!
//! let mut session = Session::new().with_memory(Arc::new(InMemoryStore::new()));
//! let answer = session.ask_with_memory(&runtime, &assistant, "I want to open a bakery").await?;
//!
//! for fact in session.facts() {
//!     println!("{}", fact);
//! }
//! ```

mod fact;
mod session;
mod summary;

pub use fact::{CollectedFact, DEFAULT_FACT_SOURCE};
pub use session::{Exchange, Session, DEFAULT_MEMORY_K};
pub use summary::{summarize_in_chunks, DEFAULT_CHUNK_SIZE};
