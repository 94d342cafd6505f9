//! Per-user state held between Telegram updates.
//!
//! One [`RagSession`] per user, opened lazily on first grounded question
//! and dropped on re-upload so the new document takes effect. Quiz
//! dialogue states live in a separate map keyed by the same user id.

use crate::errors::Result;
use crate::index::store::DocumentStore;
use crate::llm::ChatModel;
use crate::quiz::QuizState;
use crate::rag::RagSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory store of all per-user state
pub struct SessionStore {
    store: Arc<dyn DocumentStore>,
    model: Arc<dyn ChatModel>,
    retriever_k: usize,
    memory_token_limit: usize,
    sessions: Mutex<HashMap<i64, Arc<Mutex<RagSession>>>>,
    quiz_states: Mutex<HashMap<i64, QuizState>>,
}

impl SessionStore {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        model: Arc<dyn ChatModel>,
        retriever_k: usize,
        memory_token_limit: usize,
    ) -> Self {
        Self {
            store,
            model,
            retriever_k,
            memory_token_limit,
            sessions: Mutex::new(HashMap::new()),
            quiz_states: Mutex::new(HashMap::new()),
        }
    }

    /// Get the user's RAG session, opening one if none is cached.
    /// Propagates `NotIndexed` when the user has no document.
    ///
    /// The map lock is never held across the open: `RagSession::open`
    /// checks the store over the network, and one user's slow open must
    /// not stall other users. Two concurrent first calls for the same
    /// user may both open a session; the first insert wins.
    pub async fn session(&self, user_id: i64) -> Result<Arc<Mutex<RagSession>>> {
        if let Some(session) = self.sessions.lock().await.get(&user_id) {
            return Ok(Arc::clone(session));
        }

        let opened = RagSession::open(
            user_id,
            Arc::clone(&self.store),
            Arc::clone(&self.model),
            self.retriever_k,
            self.memory_token_limit,
        )
        .await?;

        let mut sessions = self.sessions.lock().await;
        let entry = sessions
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(opened)));
        Ok(Arc::clone(entry))
    }

    /// Drop the cached session so the next question reopens against the
    /// current document
    pub async fn drop_session(&self, user_id: i64) {
        self.sessions.lock().await.remove(&user_id);
    }

    /// Remove and return the user's pending quiz state, if any
    pub async fn take_quiz_state(&self, user_id: i64) -> Option<QuizState> {
        self.quiz_states.lock().await.remove(&user_id)
    }

    pub async fn set_quiz_state(&self, user_id: i64, state: QuizState) {
        self.quiz_states.lock().await.insert(user_id, state);
    }

    pub async fn has_quiz_state(&self, user_id: i64) -> bool {
        self.quiz_states.lock().await.contains_key(&user_id)
    }

    /// Forget everything about a user
    pub async fn reset(&self, user_id: i64) {
        self.sessions.lock().await.remove(&user_id);
        self.quiz_states.lock().await.remove(&user_id);
    }
}
