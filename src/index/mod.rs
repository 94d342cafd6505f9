//! Document ingestion: PDF text extraction, chunking, and the per-user
//! vector store behind the [`DocumentStore`] trait.

pub mod indexer;
pub mod splitter;
pub mod store;

pub use indexer::{DocumentIndexer, IndexReport};
pub use splitter::split_text;
pub use store::{DocumentStore, QdrantStore};
