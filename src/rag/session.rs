//! Per-user retrieval session.
//!
//! Owns the conversational memory and the retrieve-then-generate chain
//! for one user. The answer text is screened against a fixed list of
//! negative phrases; a hit turns the reply into [`RagAnswer::NoAnswer`]
//! so the orchestrator can fall back to concept explanation.

use crate::errors::{BotError, Result};
use crate::index::store::DocumentStore;
use crate::llm::ChatModel;
use crate::rag::memory::ConversationMemory;
use std::sync::Arc;

/// Topic sentinel meaning "use the whole document"
pub const WHOLE_DOCUMENT_TOPIC: &str = "весь";

/// Broad query used to sample the collection for whole-document requests
const WHOLE_DOCUMENT_QUERY: &str = "основные темы, определения и формулы конспекта";

/// Phrases marking an answer as ungrounded. Matching is case-insensitive
/// substring; the list order is irrelevant, any hit counts.
const NEGATIVE_PHRASES: [&str; 8] = [
    "не могу найти",
    "не содержится",
    "отсутствует информация",
    "не указано",
    "нет данных",
    "не нашел",
    "не нашёл",
    "отсутствуют сведения",
];

/// Outcome of a grounded question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RagAnswer {
    /// Grounded answer text, returned verbatim
    Answer(String),
    /// The model admitted the document does not cover the question
    NoAnswer,
}

/// Check an answer against the negative-phrase list.
///
/// Deterministic: the same text always produces the same verdict.
pub fn is_negative_answer(answer: &str) -> bool {
    let lowered = answer.to_lowercase();
    NEGATIVE_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

/// RAG chain with memory for a single user
pub struct RagSession {
    user_id: i64,
    store: Arc<dyn DocumentStore>,
    model: Arc<dyn ChatModel>,
    memory: ConversationMemory,
    retriever_k: usize,
}

impl std::fmt::Debug for RagSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagSession")
            .field("user_id", &self.user_id)
            .field("retriever_k", &self.retriever_k)
            .finish_non_exhaustive()
    }
}

impl RagSession {
    /// Open a session for a user; errors with `NotIndexed` when the user
    /// has no document store.
    pub async fn open(
        user_id: i64,
        store: Arc<dyn DocumentStore>,
        model: Arc<dyn ChatModel>,
        retriever_k: usize,
        memory_token_limit: usize,
    ) -> Result<Self> {
        if !store.exists(user_id).await? {
            return Err(BotError::NotIndexed { user_id });
        }

        Ok(Self {
            user_id,
            store,
            model,
            memory: ConversationMemory::new(memory_token_limit),
            retriever_k,
        })
    }

    /// Answer a question from the user's document
    pub async fn ask(&mut self, question: &str) -> Result<RagAnswer> {
        let chunks = self
            .store
            .search(self.user_id, question, self.retriever_k)
            .await?;

        let prompt = self.build_prompt(question, &chunks);
        let answer = self.model.complete(&prompt).await?;
        let answer = answer.trim().to_string();

        self.memory.record(question, &answer);
        self.memory.condense(self.model.as_ref()).await?;

        if is_negative_answer(&answer) {
            tracing::debug!(user_id = self.user_id, "answer matched negative phrase list");
            return Ok(RagAnswer::NoAnswer);
        }

        Ok(RagAnswer::Answer(answer))
    }

    /// Retrieval-only context for quiz generation. The `весь` sentinel
    /// samples the whole collection with a broad query and a doubled k.
    pub async fn context_for_topic(&self, topic: &str) -> Result<String> {
        let (query, k) = if topic.trim().to_lowercase() == WHOLE_DOCUMENT_TOPIC {
            (WHOLE_DOCUMENT_QUERY, self.retriever_k * 2)
        } else {
            (topic, self.retriever_k)
        };

        let chunks = self.store.search(self.user_id, query, k).await?;
        Ok(chunks.join("\n\n"))
    }

    fn build_prompt(&self, question: &str, chunks: &[String]) -> String {
        let context = chunks.join("\n\n");
        let history = self.memory.render();

        let mut prompt = String::from(
            "Ты — учебный ассистент. Ответь на вопрос студента, используя только \
приведённые фрагменты конспекта. Если ответа в конспекте нет, так и скажи: \
в конспекте нет данных по этому вопросу.\n\n",
        );
        prompt.push_str(&format!("Фрагменты конспекта:\n{}\n\n", context));
        if !history.is_empty() {
            prompt.push_str(&format!("История диалога:\n{}\n", history));
        }
        prompt.push_str(&format!("Вопрос: {}", question));
        prompt
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Number of verbatim exchanges currently remembered
    pub fn history_len(&self) -> usize {
        self.memory.len()
    }
}
