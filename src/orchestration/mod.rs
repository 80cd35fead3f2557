//! Orchestration of ingestion: source → engine → repository.

pub mod indexer;

pub use indexer::{IndexError, Indexer};
