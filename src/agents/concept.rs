//! Concept explanation agent.

use crate::agents::json_window;
use crate::llm::ChatModel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Context passed to the prompt is capped to keep within model limits
const MAX_CONTEXT_CHARS: usize = 4000;

/// Structured explanation of one concept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub explanation: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub study_tips: Vec<String>,
}

/// A concept extracted from free text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concept {
    pub name: String,
    pub category: Option<String>,
    pub level: Option<String>,
    pub definition: Option<String>,
}

/// Agent explaining individual concepts to students
pub struct ConceptExplainerAgent {
    model: Arc<dyn ChatModel>,
}

impl ConceptExplainerAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Generate a detailed explanation of a concept. Never fails: a parse
    /// or model failure yields a templated default.
    pub async fn explain(&self, concept: &str, context: &str) -> Explanation {
        let context_line = if context.is_empty() {
            String::new()
        } else {
            let capped: String = context.chars().take(MAX_CONTEXT_CHARS).collect();
            format!("Контекст: {}\n", capped)
        };

        let prompt = format!(
            "Подробно объясни концепт \"{concept}\" как студенту.\n{context_line}\
Структура объяснения:\n\
1. Простое определение (что это?)\n\
2. Основные принципы и характеристики\n\
3. Практические примеры и применение\n\
4. Связи с другими концептами\n\
5. Возможные трудности в понимании и как их преодолеть\n\n\
Объяснение должно быть понятным, с примерами из реальной жизни. \
Используй аналогии для сложных моментов.\n\n\
Верни ответ строго в формате JSON, без текста до или после объекта:\n\
{{\n\
  \"explanation\": \"полное объяснение\",\n\
  \"key_points\": [\"ключевой момент 1\", \"ключевой момент 2\"],\n\
  \"examples\": [\"пример 1\", \"пример 2\"],\n\
  \"study_tips\": [\"совет 1\", \"совет 2\"]\n\
}}"
        );

        match self.model.complete(&prompt).await {
            Ok(response) => {
                Self::parse_explanation(&response).unwrap_or_else(|| Self::default_explanation(concept))
            }
            Err(e) => {
                tracing::warn!("concept explanation failed: {}", e);
                Self::default_explanation(concept)
            }
        }
    }

    /// Try to parse a structured explanation; `None` when no usable JSON
    /// object is present.
    pub fn parse_explanation(response: &str) -> Option<Explanation> {
        let window = json_window(response)?;
        let parsed: Explanation = serde_json::from_str(window).ok()?;
        if parsed.explanation.trim().is_empty() {
            return None;
        }
        Some(parsed)
    }

    fn default_explanation(concept: &str) -> Explanation {
        Explanation {
            explanation: format!(
                "Концепт '{}' — это важное понятие в изучаемой области.",
                concept
            ),
            key_points: vec![
                "Основное понятие предмета".to_string(),
                "Имеет практическое применение".to_string(),
            ],
            examples: vec!["Пример из реальной жизни".to_string()],
            study_tips: vec![
                "Изучите основные определения".to_string(),
                "Практикуйтесь на примерах".to_string(),
            ],
        }
    }

    /// Extract up to `max_concepts` key concepts from a text sample
    pub async fn extract_concepts(&self, text: &str, max_concepts: usize) -> Vec<Concept> {
        let capped: String = text.chars().take(MAX_CONTEXT_CHARS).collect();
        let prompt = format!(
            "Проанализируй следующий текст и выдели {max_concepts} самых важных \
концептов, терминов, теорий или методов.\n\
Для каждого концепта предоставь:\n\
- Название\n\
- Категория (физика, математика, программирование и т.д.)\n\
- Уровень сложности (базовый, средний, продвинутый)\n\
- Краткое определение (1-2 предложения)\n\n\
Текст для анализа:\n{capped}\n\n\
Верни ответ в формате:\n\
КОНЦЕПТ: [название]\n\
КАТЕГОРИЯ: [категория]\n\
УРОВЕНЬ: [уровень]\n\
ОПРЕДЕЛЕНИЕ: [определение]\n\
---"
        );

        match self.model.complete(&prompt).await {
            Ok(response) => Self::parse_concepts(&response),
            Err(e) => {
                tracing::warn!("concept extraction failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Parse the line-tagged concept format
    pub fn parse_concepts(response: &str) -> Vec<Concept> {
        let mut concepts = Vec::new();
        let mut current: Option<Concept> = None;

        for line in response.lines() {
            let line = line.trim();
            if let Some(name) = line.strip_prefix("КОНЦЕПТ:") {
                if let Some(concept) = current.take() {
                    concepts.push(concept);
                }
                current = Some(Concept {
                    name: name.trim().to_string(),
                    category: None,
                    level: None,
                    definition: None,
                });
            } else if let Some(category) = line.strip_prefix("КАТЕГОРИЯ:") {
                if let Some(concept) = current.as_mut() {
                    concept.category = Some(category.trim().to_string());
                }
            } else if let Some(level) = line.strip_prefix("УРОВЕНЬ:") {
                if let Some(concept) = current.as_mut() {
                    concept.level = Some(level.trim().to_string());
                }
            } else if let Some(definition) = line.strip_prefix("ОПРЕДЕЛЕНИЕ:") {
                if let Some(concept) = current.as_mut() {
                    concept.definition = Some(definition.trim().to_string());
                }
            } else if line == "---" {
                if let Some(concept) = current.take() {
                    concepts.push(concept);
                }
            }
        }

        if let Some(concept) = current {
            concepts.push(concept);
        }

        concepts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use async_trait::async_trait;

    struct FixedModel(String);

    #[async_trait]
    impl ChatModel for FixedModel {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_parse_explanation_valid_json() {
        let response = r#"{"explanation":"Сила — мера взаимодействия","key_points":["векторная величина"],"examples":["толчок"],"study_tips":["решайте задачи"]}"#;
        let parsed = ConceptExplainerAgent::parse_explanation(response).unwrap();
        assert_eq!(parsed.explanation, "Сила — мера взаимодействия");
        assert_eq!(parsed.key_points.len(), 1);
    }

    #[test]
    fn test_parse_explanation_wrapped_json() {
        let response = "Вот объяснение:\n{\"explanation\":\"текст\"}\nГотово.";
        let parsed = ConceptExplainerAgent::parse_explanation(response).unwrap();
        assert_eq!(parsed.explanation, "текст");
        assert!(parsed.key_points.is_empty());
    }

    #[test]
    fn test_parse_explanation_garbage_is_none() {
        assert!(ConceptExplainerAgent::parse_explanation("просто текст").is_none());
        assert!(ConceptExplainerAgent::parse_explanation("{\"explanation\":\"\"}").is_none());
    }

    #[tokio::test]
    async fn test_explain_falls_back_on_unparseable_reply() {
        let agent = ConceptExplainerAgent::new(Arc::new(FixedModel("не json".to_string())));
        let explanation = agent.explain("сила", "").await;
        assert!(explanation.explanation.contains("сила"));
        assert!(!explanation.study_tips.is_empty());
    }

    #[test]
    fn test_parse_concepts_line_format() {
        let response = "\
КОНЦЕПТ: Сила
КАТЕГОРИЯ: физика
УРОВЕНЬ: базовый
ОПРЕДЕЛЕНИЕ: Мера взаимодействия тел.
---
КОНЦЕПТ: Импульс
КАТЕГОРИЯ: физика
УРОВЕНЬ: средний
ОПРЕДЕЛЕНИЕ: Произведение массы на скорость.
---";
        let concepts = ConceptExplainerAgent::parse_concepts(response);
        assert_eq!(concepts.len(), 2);
        assert_eq!(concepts[0].name, "Сила");
        assert_eq!(concepts[1].level.as_deref(), Some("средний"));
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(crate::errors::BotError::Llm("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_extract_concepts_end_to_end() {
        let reply = "\
КОНЦЕПТ: Градиент
КАТЕГОРИЯ: математика
УРОВЕНЬ: средний
ОПРЕДЕЛЕНИЕ: Вектор скорейшего роста функции.
---";
        let agent = ConceptExplainerAgent::new(Arc::new(FixedModel(reply.to_string())));
        let concepts = agent.extract_concepts("текст конспекта про градиенты", 3).await;
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].name, "Градиент");
        assert_eq!(concepts[0].category.as_deref(), Some("математика"));
        assert_eq!(
            concepts[0].definition.as_deref(),
            Some("Вектор скорейшего роста функции.")
        );
    }

    #[tokio::test]
    async fn test_extract_concepts_empty_on_model_failure() {
        let agent = ConceptExplainerAgent::new(Arc::new(FailingModel));
        let concepts = agent.extract_concepts("текст", 3).await;
        assert!(concepts.is_empty());
    }

    #[test]
    fn test_parse_concepts_trailing_without_separator() {
        let response = "КОНЦЕПТ: Энергия\nКАТЕГОРИЯ: физика";
        let concepts = ConceptExplainerAgent::parse_concepts(response);
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].name, "Энергия");
    }
}
