//! Document-grounded question answering with per-user conversational
//! memory.

pub mod memory;
pub mod session;

pub use memory::ConversationMemory;
pub use session::{RagAnswer, RagSession, WHOLE_DOCUMENT_TOPIC};
