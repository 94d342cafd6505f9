//! Learning-source finder agent.
//!
//! Combines a small curated knowledge base with LLM suggestions; curated
//! entries go first so a model failure still yields something useful.

use crate::agents::json_window;
use crate::llm::ChatModel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceList {
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub study_path: Vec<String>,
}

/// Curated entries keyed by subject keywords
struct KnowledgeBase {
    keywords: &'static [&'static str],
    category: &'static str,
    textbooks: &'static [&'static str],
    online_courses: &'static [&'static str],
}

const KNOWLEDGE_BASES: [KnowledgeBase; 2] = [
    KnowledgeBase {
        keywords: &["физик", "механ", "электр"],
        category: "physics",
        textbooks: &[
            "Фейнмановские лекции по физике",
            "Берклеевский курс физики",
            "Савельев - Курс общей физики",
        ],
        online_courses: &["Coursera - Физика", "Stepik - Основы физики"],
    },
    KnowledgeBase {
        keywords: &["математ", "алгебр", "геометр"],
        category: "mathematics",
        textbooks: &[
            "Высшая математика - Данко",
            "Математический анализ - Фихтенгольц",
        ],
        online_courses: &[
            "Coursera - Математика для физиков",
            "MIT OpenCourseWare - Mathematics",
        ],
    },
];

/// Entries taken from each curated list per category
const BASE_SOURCES_PER_LIST: usize = 2;

/// Agent recommending external learning resources
pub struct SourceFinderAgent {
    model: Arc<dyn ChatModel>,
}

impl SourceFinderAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Find learning sources for a topic. Curated knowledge-base entries
    /// are prepended to whatever the model suggests; on failure a
    /// search-link fallback is returned.
    pub async fn find_sources(&self, topic: &str, context: &str) -> SourceList {
        let context_line = if context.is_empty() {
            String::new()
        } else {
            format!("Контекст: {}\n", context)
        };

        let prompt = format!(
            "Для темы \"{topic}\" предложи лучшие учебные ресурсы.\n{context_line}\
Включи разные типы источников:\n\
- Учебники и книги\n\
- Онлайн-курсы\n\
- Научные статьи\n\
- Обучающие видео\n\
- Интерактивные платформы\n\n\
Для каждого источника укажи название, тип, уровень, краткое описание и где найти.\n\n\
Верни ответ в формате JSON:\n\
{{\n\
  \"sources\": [\n\
    {{\"name\": \"Название\", \"type\": \"Тип\", \"level\": \"Уровень\", \
\"description\": \"Описание\", \"link\": \"Ссылка\"}}\n\
  ],\n\
  \"study_path\": [\"Этап 1\", \"Этап 2\"]\n\
}}"
        );

        let mut result = match self.model.complete(&prompt).await {
            Ok(response) => Self::parse_sources(&response)
                .unwrap_or_else(|| Self::fallback_sources(topic)),
            Err(e) => {
                tracing::warn!("source finding failed: {}", e);
                Self::fallback_sources(topic)
            }
        };

        let mut base = Self::base_sources(topic);
        if !base.is_empty() {
            base.extend(result.sources);
            result.sources = base;
        }

        result
    }

    /// Try to parse the model's JSON; `None` when absent or empty
    pub fn parse_sources(response: &str) -> Option<SourceList> {
        let window = json_window(response)?;
        let parsed: SourceList = serde_json::from_str(window).ok()?;
        if parsed.sources.is_empty() && parsed.study_path.is_empty() {
            return None;
        }
        Some(parsed)
    }

    /// Curated entries matching the topic by keyword
    pub fn base_sources(topic: &str) -> Vec<Source> {
        let lowered = topic.to_lowercase();
        let mut sources = Vec::new();

        for base in KNOWLEDGE_BASES.iter() {
            if !base.keywords.iter().any(|k| lowered.contains(k)) {
                continue;
            }
            for name in base.textbooks.iter().take(BASE_SOURCES_PER_LIST) {
                sources.push(Source {
                    name: name.to_string(),
                    kind: "учебник".to_string(),
                    level: "средний".to_string(),
                    description: format!("Классический ресурс по {}", base.category),
                    link: search_link(name, topic),
                });
            }
            for name in base.online_courses.iter().take(BASE_SOURCES_PER_LIST) {
                sources.push(Source {
                    name: name.to_string(),
                    kind: "онлайн-курс".to_string(),
                    level: "средний".to_string(),
                    description: format!("Классический ресурс по {}", base.category),
                    link: search_link(name, topic),
                });
            }
        }

        sources
    }

    /// Generic sources when the model gives nothing usable
    pub fn fallback_sources(topic: &str) -> SourceList {
        SourceList {
            sources: vec![
                Source {
                    name: format!("Учебники по {}", topic),
                    kind: "учебник".to_string(),
                    level: "разный".to_string(),
                    description: format!("Классические учебники по теме \"{}\"", topic),
                    link: search_link(topic, "учебник"),
                },
                Source {
                    name: "Coursera".to_string(),
                    kind: "онлайн-курс".to_string(),
                    level: "начальный-средний".to_string(),
                    description: format!("Курсы по теме \"{}\"", topic),
                    link: format!("https://www.coursera.org/search?query={}", topic),
                },
            ],
            study_path: vec![
                "Начните с базовых понятий".to_string(),
                "Изучите основные принципы".to_string(),
                "Практикуйтесь на задачах".to_string(),
            ],
        }
    }
}

fn search_link(source: &str, topic: &str) -> String {
    let query = format!("{} {}", source, topic).replace(' ', "+");
    format!("https://www.google.com/search?q={}", query)
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
    fn test_base_sources_physics_keyword() {
        let sources = SourceFinderAgent::base_sources("классическая механика");
        assert!(!sources.is_empty());
        assert!(sources.iter().any(|s| s.name.contains("Фейнман")));
    }

    #[test]
    fn test_base_sources_unknown_topic_empty() {
        assert!(SourceFinderAgent::base_sources("история древнего Рима").is_empty());
    }

    #[test]
    fn test_fallback_has_study_path() {
        let fallback = SourceFinderAgent::fallback_sources("оптика");
        assert_eq!(fallback.sources.len(), 2);
        assert_eq!(fallback.study_path.len(), 3);
    }

    #[test]
    fn test_search_link_encodes_spaces() {
        let link = search_link("Курс физики", "механика");
        assert!(!link.contains(' '));
        assert!(link.starts_with("https://www.google.com/search?q="));
    }

    #[tokio::test]
    async fn test_curated_entries_precede_llm_results() {
        let reply = r#"{"sources":[{"name":"Какой-то сайт","type":"видео","level":"базовый","description":"","link":""}],"study_path":["Этап"]}"#;
        let agent = SourceFinderAgent::new(Arc::new(FixedModel(reply.to_string())));
        let result = agent.find_sources("электродинамика", "").await;

        assert!(result.sources.len() > 1);
        assert!(result.sources[0].name.contains("Фейнман") || result.sources[0].kind == "учебник");
        assert_eq!(result.sources.last().unwrap().name, "Какой-то сайт");
    }

    #[tokio::test]
    async fn test_unparseable_reply_gives_fallback() {
        let agent = SourceFinderAgent::new(Arc::new(FixedModel("ничего".to_string())));
        let result = agent.find_sources("оптика", "").await;
        assert!(!result.sources.is_empty());
        assert!(!result.study_path.is_empty());
    }
}
