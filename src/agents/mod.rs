//! Specialized generation agents.
//!
//! Each agent wraps one prompt template, one [`ChatModel`] call and a
//! parser for the structured reply. Agents hold no shared state; parse
//! failures fall back to templated defaults rather than surfacing errors.
//!
//! [`ChatModel`]: crate::llm::ChatModel

pub mod advisor;
pub mod concept;
pub mod quiz;
pub mod sources;

pub use advisor::{Advice, StudyAdvisorAgent, StudyPlan};
pub use concept::{ConceptExplainerAgent, Explanation};
pub use quiz::{QuizAgent, QuizQuestion};
pub use sources::{Source, SourceFinderAgent, SourceList};

/// Extract the outermost `{ ... }` window from an LLM reply.
///
/// Models often wrap JSON in prose or code fences; this takes everything
/// between the first `{` and the last `}`.
pub(crate) fn json_window(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_window_plain() {
        assert_eq!(json_window(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_json_window_wrapped_in_prose() {
        let text = "Вот ответ: {\"a\":1} — готово.";
        assert_eq!(json_window(text), Some("{\"a\":1}"));
    }

    #[test]
    fn test_json_window_missing() {
        assert_eq!(json_window("никакого json"), None);
        assert_eq!(json_window("} перевёрнуто {"), None);
    }
}
