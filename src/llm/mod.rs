//! GigaChat API access: OAuth token cache and chat-completion client.
//!
//! Every agent and the RAG session talk to the model through the
//! [`ChatModel`] trait so tests can substitute a scripted model.

pub mod client;
pub mod token;

pub use client::{ChatModel, GigaChatClient};
pub use token::TokenCache;
