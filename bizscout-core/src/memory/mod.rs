//! Long-term memory for chat sessions
//!
//! Past exchanges are stored as documents in a [`SimilarityStore`]; before
//! a turn, the most similar ones are joined into context text.

mod inmemory;
mod store;

pub use inmemory::InMemoryStore;
pub use store::{build_context, Document, SimilarityStore, CONTEXT_SEPARATOR};
