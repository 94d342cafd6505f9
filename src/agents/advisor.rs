//! Study-advisor agent: learning advice, note-taking help, study plans.

use crate::agents::json_window;
use crate::llm::ChatModel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Notes sample passed to the improvement prompt is capped
const MAX_NOTES_CHARS: usize = 3000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advice {
    pub advice: String,
    #[serde(default)]
    pub quick_tips: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyPlan {
    pub plan: String,
    #[serde(default)]
    pub milestones: Vec<String>,
    #[serde(default)]
    pub daily_time: String,
}

/// Agent producing personalized study recommendations
pub struct StudyAdvisorAgent {
    model: Arc<dyn ChatModel>,
}

impl StudyAdvisorAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// General study advice
    pub async fn study_advice(&self) -> Advice {
        let prompt = "\
Дай универсальные учебные советы для студентов. Включи:\n\
- Методы эффективного обучения\n\
- Техники запоминания\n\
- Советы по тайм-менеджменту\n\
- Рекомендации по отдыху и перерывам\n\n\
Верни в формате JSON:\n\
{\n\
  \"advice\": \"основной текст советов\",\n\
  \"quick_tips\": [\"совет 1\", \"совет 2\", \"совет 3\"],\n\
  \"methods\": [\"метод 1\", \"метод 2\"]\n\
}";
        self.ask_for_advice(prompt).await
    }

    /// Advice on keeping lecture notes
    pub async fn notes_advice(&self, context: &str) -> Advice {
        let context_line = if context.is_empty() {
            String::new()
        } else {
            format!("Контекст: {}\n", context)
        };
        let prompt = format!(
            "Дай советы по эффективному ведению конспектов.\n{context_line}\
Включи:\n\
- Методы структурирования заметок\n\
- Техники визуального оформления\n\
- Советы по быстрому конспектированию\n\
- Рекомендации по повторению\n\n\
Верни в формате JSON:\n\
{{\n\
  \"advice\": \"основной текст советов\",\n\
  \"quick_tips\": [\"совет 1\", \"совет 2\"],\n\
  \"methods\": [\"метод 1\", \"метод 2\"]\n\
}}"
        );
        self.ask_for_advice(&prompt).await
    }

    /// Memorization techniques
    pub async fn memory_techniques(&self) -> Advice {
        let prompt = "\
Опиши эффективные техники запоминания учебного материала: интервальные \
повторения, мнемоники, активное вспоминание, метод дворца памяти.\n\n\
Верни в формате JSON:\n\
{\n\
  \"advice\": \"основной текст\",\n\
  \"quick_tips\": [\"приём 1\", \"приём 2\"],\n\
  \"methods\": [\"техника 1\", \"техника 2\"]\n\
}";
        self.ask_for_advice(prompt).await
    }

    /// Concrete suggestions for improving a notes sample
    pub async fn improve_notes(&self, notes_sample: &str) -> Advice {
        let capped: String = notes_sample.chars().take(MAX_NOTES_CHARS).collect();
        let prompt = format!(
            "Проанализируй фрагмент конспекта и предложи конкретные улучшения: \
структура, полнота, оформление, что добавить.\n\n\
Фрагмент конспекта:\n{capped}\n\n\
Верни в формате JSON:\n\
{{\n\
  \"advice\": \"анализ и рекомендации\",\n\
  \"quick_tips\": [\"улучшение 1\", \"улучшение 2\"],\n\
  \"methods\": [\"метод 1\"]\n\
}}"
        );
        self.ask_for_advice(&prompt).await
    }

    /// Build a study plan for a topic within a timeframe
    pub async fn study_plan(&self, topic: &str, timeframe: &str, context: &str) -> StudyPlan {
        let context_line = if context.is_empty() {
            String::new()
        } else {
            format!("Контекст: {}\n", context)
        };
        let prompt = format!(
            "Составь учебный план по теме \"{topic}\" на срок \"{timeframe}\".\n{context_line}\
План должен быть реалистичным, с этапами и контрольными точками.\n\n\
Верни в формате JSON:\n\
{{\n\
  \"plan\": \"описание плана по этапам\",\n\
  \"milestones\": [\"контрольная точка 1\", \"контрольная точка 2\"],\n\
  \"daily_time\": \"рекомендуемое время в день\"\n\
}}"
        );

        match self.model.complete(&prompt).await {
            Ok(response) => {
                Self::parse_plan(&response).unwrap_or_else(|| Self::default_plan(topic, timeframe))
            }
            Err(e) => {
                tracing::warn!("study plan generation failed: {}", e);
                Self::default_plan(topic, timeframe)
            }
        }
    }

    async fn ask_for_advice(&self, prompt: &str) -> Advice {
        match self.model.complete(prompt).await {
            Ok(response) => Self::parse_advice(&response).unwrap_or_else(Self::default_advice),
            Err(e) => {
                tracing::warn!("advice generation failed: {}", e);
                Self::default_advice()
            }
        }
    }

    pub fn parse_advice(response: &str) -> Option<Advice> {
        let window = json_window(response)?;
        let parsed: Advice = serde_json::from_str(window).ok()?;
        if parsed.advice.trim().is_empty() {
            return None;
        }
        Some(parsed)
    }

    pub fn parse_plan(response: &str) -> Option<StudyPlan> {
        let window = json_window(response)?;
        let parsed: StudyPlan = serde_json::from_str(window).ok()?;
        if parsed.plan.trim().is_empty() {
            return None;
        }
        Some(parsed)
    }

    fn default_advice() -> Advice {
        Advice {
            advice: "Учитесь регулярно, короткими сессиями, с активным повторением \
материала и обязательными перерывами."
                .to_string(),
            quick_tips: vec![
                "Занимайтесь по 25-30 минут с перерывами".to_string(),
                "Повторяйте материал через день, неделю и месяц".to_string(),
                "Объясняйте выученное своими словами".to_string(),
            ],
            methods: vec![
                "Метод помидора".to_string(),
                "Интервальные повторения".to_string(),
            ],
        }
    }

    fn default_plan(topic: &str, timeframe: &str) -> StudyPlan {
        StudyPlan {
            plan: format!(
                "Изучение темы \"{}\" за {}: начните с базовых определений, затем \
разберите основные разделы конспекта, решите практические задачи и \
завершите повторением.",
                topic, timeframe
            ),
            milestones: vec![
                "Базовые понятия разобраны".to_string(),
                "Основные разделы пройдены".to_string(),
                "Практика и повторение завершены".to_string(),
            ],
            daily_time: "30-60 минут".to_string(),
        }
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

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(crate::errors::BotError::Llm("down".to_string()))
        }
    }

    #[test]
    fn test_parse_advice_valid() {
        let raw = r#"{"advice":"Учитесь понемногу","quick_tips":["совет"],"methods":[]}"#;
        let advice = StudyAdvisorAgent::parse_advice(raw).unwrap();
        assert_eq!(advice.advice, "Учитесь понемногу");
        assert_eq!(advice.quick_tips.len(), 1);
    }

    #[test]
    fn test_parse_advice_empty_is_none() {
        assert!(StudyAdvisorAgent::parse_advice(r#"{"advice":"  "}"#).is_none());
        assert!(StudyAdvisorAgent::parse_advice("обычный текст").is_none());
    }

    #[tokio::test]
    async fn test_advice_defaults_on_model_failure() {
        let agent = StudyAdvisorAgent::new(Arc::new(FailingModel));
        let advice = agent.study_advice().await;
        assert!(!advice.advice.is_empty());
        assert!(!advice.quick_tips.is_empty());
    }

    #[tokio::test]
    async fn test_memory_techniques_parses_model_json() {
        let raw = r#"{"advice":"Повторяйте с интервалами","quick_tips":["карточки"],"methods":["дворец памяти"]}"#;
        let agent = StudyAdvisorAgent::new(Arc::new(FixedModel(raw.to_string())));
        let advice = agent.memory_techniques().await;
        assert_eq!(advice.advice, "Повторяйте с интервалами");
        assert_eq!(advice.methods, vec!["дворец памяти".to_string()]);
    }

    #[tokio::test]
    async fn test_improve_notes_caps_sample_and_parses() {
        let raw = r#"{"advice":"Добавьте заголовки","quick_tips":[],"methods":[]}"#;
        let agent = StudyAdvisorAgent::new(Arc::new(FixedModel(raw.to_string())));
        // A sample well past the cap must not break the call
        let sample = "а".repeat(MAX_NOTES_CHARS * 2);
        let advice = agent.improve_notes(&sample).await;
        assert_eq!(advice.advice, "Добавьте заголовки");
    }

    #[tokio::test]
    async fn test_improve_notes_defaults_on_model_failure() {
        let agent = StudyAdvisorAgent::new(Arc::new(FailingModel));
        let advice = agent.improve_notes("короткий конспект").await;
        assert!(!advice.advice.is_empty());
    }

    #[tokio::test]
    async fn test_study_plan_parses_model_json() {
        let raw = r#"{"plan":"Неделя 1 — основы","milestones":["основы"],"daily_time":"час"}"#;
        let agent = StudyAdvisorAgent::new(Arc::new(FixedModel(raw.to_string())));
        let plan = agent.study_plan("механика", "2 недели", "").await;
        assert_eq!(plan.plan, "Неделя 1 — основы");
        assert_eq!(plan.daily_time, "час");
    }

    #[tokio::test]
    async fn test_study_plan_default_mentions_topic() {
        let agent = StudyAdvisorAgent::new(Arc::new(FailingModel));
        let plan = agent.study_plan("оптика", "неделя", "").await;
        assert!(plan.plan.contains("оптика"));
        assert!(plan.plan.contains("неделя"));
    }
}
