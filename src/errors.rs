//! Error types for the studybuddy bot.
//!
//! All fallible operations return [`Result`]. Conditions that drive
//! control flow (a user without an indexed document, an empty quiz) are
//! modelled as dedicated variants rather than stringly-typed errors.

use thiserror::Error;

/// Main error type for the bot
#[derive(Error, Debug)]
pub enum BotError {
    /// The user has never uploaded a document, or the store was reset
    #[error("no indexed document for user {user_id}")]
    NotIndexed { user_id: i64 },

    /// The uploaded document produced no extractable text
    #[error("document contains no extractable text")]
    EmptyDocument,

    /// GigaChat API errors
    #[error("LLM API error: {0}")]
    Llm(String),

    /// OAuth token acquisition errors
    #[error("authorization error: {0}")]
    Auth(String),

    /// Vector store errors
    #[error("vector store error: {0}")]
    Vector(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for bot operations
pub type Result<T> = std::result::Result<T, BotError>;

impl From<anyhow::Error> for BotError {
    fn from(err: anyhow::Error) -> Self {
        BotError::Generic(err.to_string())
    }
}

impl BotError {
    /// True when the error means the user simply has no document yet
    pub fn is_not_indexed(&self) -> bool {
        matches!(self, BotError::NotIndexed { .. })
    }
}
