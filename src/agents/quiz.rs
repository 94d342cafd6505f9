//! Quiz generation agent.
//!
//! Asks the model for a strict-JSON test over the retrieved notes
//! context. Any parse failure yields an empty question list; the quiz
//! flow treats that as a generation failure and aborts.

use crate::agents::json_window;
use crate::llm::ChatModel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Notes context passed to the prompt is capped at this many characters
const MAX_CONTEXT_CHARS: usize = 9000;

/// One multiple-choice question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
struct QuizResponse {
    #[serde(default)]
    questions: Vec<QuizQuestion>,
}

/// Agent generating tests over the user's notes
pub struct QuizAgent {
    model: Arc<dyn ChatModel>,
}

impl QuizAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Generate up to `num_questions` questions over `context_text`.
    /// Empty context or an unusable model reply yields an empty list.
    pub async fn generate(
        &self,
        context_text: &str,
        num_questions: usize,
        topic: Option<&str>,
    ) -> Vec<QuizQuestion> {
        if context_text.trim().is_empty() {
            return Vec::new();
        }

        let topic_hint = match topic {
            Some(t) if t.trim().to_lowercase() != crate::rag::WHOLE_DOCUMENT_TOPIC => {
                format!("по теме: {}", t)
            }
            _ => "по основным темам конспекта".to_string(),
        };

        let safe_context: String = context_text.chars().take(MAX_CONTEXT_CHARS).collect();

        let prompt = format!(
            "Проанализируй следующий конспект и составь тест из {num_questions} \
вопросов {topic_hint}.\n\n\
Текст конспекта:\n\n\
\"\"\"{safe_context}\"\"\"\n\n\
Требования:\n\
1. Верни СТРОГО валидный JSON, без пояснений и без markdown.\n\
2. Структура ответа:\n\
{{\n\
  \"questions\": [\n\
    {{\n\
      \"question\": \"Текст вопроса?\",\n\
      \"options\": [\"Вариант A\", \"Вариант B\", \"Вариант C\", \"Вариант D\"],\n\
      \"correct_answer\": \"Текст правильного ответа\",\n\
      \"explanation\": \"Краткое объяснение, почему этот ответ правильный\"\n\
    }}\n\
  ]\n\
}}"
        );

        match self.model.complete(&prompt).await {
            Ok(response) => Self::parse_quiz(&response),
            Err(e) => {
                tracing::warn!("quiz generation failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Parse the model reply: strip code fences, take the outermost JSON
    /// object, deserialize. Anything unusable yields an empty list.
    pub fn parse_quiz(response: &str) -> Vec<QuizQuestion> {
        let content = response.replace("```json", "").replace("```", "");

        let Some(window) = json_window(&content) else {
            return Vec::new();
        };

        match serde_json::from_str::<QuizResponse>(window) {
            Ok(parsed) => parsed.questions,
            Err(e) => {
                tracing::warn!("quiz JSON parse failed: {}", e);
                Vec::new()
            }
        }
    }
}
