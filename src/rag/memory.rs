//! Summarized conversation buffer.
//!
//! Keeps recent question/answer exchanges verbatim and folds older ones
//! into a running summary once the estimated token budget is exceeded.
//! Summarization is best effort: if the model call fails, the oldest
//! exchanges are simply dropped.

use crate::errors::Result;
use crate::llm::ChatModel;

/// Exchanges folded into the summary per condensation pass
const FOLD_BATCH: usize = 2;

/// One question/answer turn
#[derive(Debug, Clone)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

/// Token-bounded conversation history
#[derive(Debug, Default)]
pub struct ConversationMemory {
    summary: Option<String>,
    exchanges: Vec<Exchange>,
    token_limit: usize,
}

/// Rough token estimate: ~4 characters per token
fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

impl ConversationMemory {
    pub fn new(token_limit: usize) -> Self {
        Self {
            summary: None,
            exchanges: Vec::new(),
            token_limit,
        }
    }

    /// Record a completed exchange
    pub fn record(&mut self, question: &str, answer: &str) {
        self.exchanges.push(Exchange {
            question: question.to_string(),
            answer: answer.to_string(),
        });
    }

    /// Estimated token footprint of the whole buffer
    pub fn estimated_tokens(&self) -> usize {
        let summary_tokens = self.summary.as_deref().map(estimate_tokens).unwrap_or(0);
        let exchange_tokens: usize = self
            .exchanges
            .iter()
            .map(|e| estimate_tokens(&e.question) + estimate_tokens(&e.answer))
            .sum();
        summary_tokens + exchange_tokens
    }

    /// True when the buffer exceeds its budget
    pub fn over_budget(&self) -> bool {
        self.estimated_tokens() > self.token_limit
    }

    /// Fold the oldest exchanges into the summary until within budget
    pub async fn condense(&mut self, model: &dyn ChatModel) -> Result<()> {
        while self.over_budget() && !self.exchanges.is_empty() {
            let take = FOLD_BATCH.min(self.exchanges.len());
            let oldest: Vec<Exchange> = self.exchanges.drain(..take).collect();

            let mut dialogue = String::new();
            if let Some(summary) = &self.summary {
                dialogue.push_str("Предыдущее резюме: ");
                dialogue.push_str(summary);
                dialogue.push('\n');
            }
            for exchange in &oldest {
                dialogue.push_str(&format!(
                    "Студент: {}\nАссистент: {}\n",
                    exchange.question, exchange.answer
                ));
            }

            let prompt = format!(
                "Сожми следующий учебный диалог в краткое резюме (2-3 предложения), \
сохранив упомянутые темы и выводы.\n\n{}",
                dialogue
            );

            match model.complete(&prompt).await {
                Ok(new_summary) => {
                    self.summary = Some(new_summary.trim().to_string());
                }
                Err(e) => {
                    // Keep going with the exchanges already dropped
                    tracing::warn!("history summarization failed: {}", e);
                }
            }
        }
        Ok(())
    }

    /// Render the history for inclusion in a prompt; empty string when
    /// there is no history yet
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(summary) = &self.summary {
            out.push_str("Резюме предыдущего диалога: ");
            out.push_str(summary);
            out.push('\n');
        }
        for exchange in &self.exchanges {
            out.push_str(&format!(
                "Студент: {}\nАссистент: {}\n",
                exchange.question, exchange.answer
            ));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.exchanges.is_empty()
    }

    /// Number of verbatim exchanges currently held
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedModel(String);

    #[async_trait]
    impl ChatModel for FixedModel {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(crate::errors::BotError::Llm("down".to_string()))
        }
    }

    #[test]
    fn test_empty_memory() {
        let memory = ConversationMemory::new(3000);
        assert!(memory.is_empty());
        assert_eq!(memory.estimated_tokens(), 0);
        assert_eq!(memory.render(), "");
    }

    #[test]
    fn test_record_and_render() {
        let mut memory = ConversationMemory::new(3000);
        memory.record("Что такое сила?", "Сила — мера взаимодействия тел.");
        assert_eq!(memory.len(), 1);
        let rendered = memory.render();
        assert!(rendered.contains("Студент: Что такое сила?"));
        assert!(rendered.contains("Ассистент:"));
    }

    #[tokio::test]
    async fn test_condense_folds_oldest_into_summary() {
        let mut memory = ConversationMemory::new(10);
        memory.record(&"в".repeat(100), &"о".repeat(100));
        memory.record("второй вопрос", "второй ответ");
        assert!(memory.over_budget());

        let model = FixedModel("Обсудили силу и энергию.".to_string());
        memory.condense(&model).await.unwrap();

        assert!(memory.render().contains("Обсудили силу и энергию."));
        assert!(memory.len() < 2);
    }

    #[tokio::test]
    async fn test_condense_survives_model_failure() {
        let mut memory = ConversationMemory::new(10);
        memory.record(&"в".repeat(200), &"о".repeat(200));
        memory.record(&"в".repeat(200), &"о".repeat(200));

        memory.condense(&FailingModel).await.unwrap();

        // Oldest exchanges were dropped even though summarization failed
        assert!(!memory.over_budget());
    }

    #[tokio::test]
    async fn test_condense_noop_within_budget() {
        let mut memory = ConversationMemory::new(3000);
        memory.record("вопрос", "ответ");
        memory.condense(&FailingModel).await.unwrap();
        assert_eq!(memory.len(), 1);
    }
}
