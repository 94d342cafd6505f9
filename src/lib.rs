//! Telegram study-assistant bot.
//!
//! Students upload a PDF with lecture notes; the bot indexes it into a
//! per-user vector store and then answers questions grounded in the
//! notes, explains concepts, recommends sources, gives study advice and
//! runs quizzes. Routing is regex-based; generation goes through
//! GigaChat, retrieval through Qdrant with local rubert-tiny2
//! embeddings.

pub mod agents;
pub mod bot;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod errors;
pub mod index;
pub mod llm;
pub mod orchestrator;
pub mod quiz;
pub mod rag;
pub mod routing;
pub mod session;

pub use errors::{BotError, Result};
