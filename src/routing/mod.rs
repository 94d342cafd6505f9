//! Intent classification for incoming queries.
//!
//! An ordered list of regex groups is evaluated top to bottom and the
//! first group with any match wins. The order is the tie-break policy:
//! concept explanation sits first so ambiguous queries resolve there
//! (it is the most common ask). Do not reorder the groups.

use regex::RegexSet;

/// Classified purpose of a user query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    ConceptExplanation,
    SourceFinding,
    StudyAdvice,
    NotesImprovement,
    StudyPlan,
    Quiz,
    General,
}

impl Intent {
    /// Human-readable intent name (used in logs)
    pub fn name(&self) -> &'static str {
        match self {
            Intent::ConceptExplanation => "concept_explanation",
            Intent::SourceFinding => "source_finding",
            Intent::StudyAdvice => "study_advice",
            Intent::NotesImprovement => "notes_improvement",
            Intent::StudyPlan => "study_plan",
            Intent::Quiz => "quiz",
            Intent::General => "general",
        }
    }
}

/// Pattern groups in priority order. Group order is load-bearing.
const PATTERN_GROUPS: [(Intent, &[&str]); 6] = [
    (
        Intent::ConceptExplanation,
        &[
            r"(?i)что\s+такое",
            r"(?i)\bобъясни",
            r"(?i)\bпоясни",
            r"(?i)расскажи\s+(про|о|об)\b",
            r"(?i)дай\s+определение",
            r"(?i)в\s+ч[её]м\s+смысл",
        ],
    ),
    (
        Intent::SourceFinding,
        &[
            r"(?i)источник",
            r"(?i)литератур",
            r"(?i)учебник",
            r"(?i)\bкниг",
            r"(?i)где\s+(почитать|найти|посмотреть)",
            r"(?i)что\s+почитать",
            r"(?i)материалы?\s+для\s+изучени",
            r"(?i)\bкурсы?\b",
        ],
    ),
    (
        Intent::StudyAdvice,
        &[
            r"(?i)как\s+(лучше\s+)?(учить|изучать|запомнить|запоминать)",
            r"(?i)\bсовет",
            r"(?i)как\s+готовиться",
            r"(?i)рекомендаци",
            r"(?i)как\s+эффективн",
        ],
    ),
    (
        Intent::NotesImprovement,
        &[
            r"(?i)улучши(ть)?\s+.{0,40}конспект",
            r"(?i)конспект\s+.{0,40}улучши",
            r"(?i)как\s+вести\s+конспект",
            r"(?i)провер(ь|ить)\s+.{0,40}конспект",
            r"(?i)оформ.{0,30}конспект",
        ],
    ),
    (
        Intent::StudyPlan,
        &[
            r"(?i)\bплан\b",
            r"(?i)расписание",
            r"(?i)как\s+выучить\s+за",
            r"(?i)за\s+(день|неделю|месяц|сессию)",
        ],
    ),
    (
        Intent::Quiz,
        &[r"(?i)квиз", r"(?i)\bтест", r"(?i)викторин", r"(?i)\bquiz\b"],
    ),
];

/// Ordered regex classifier
pub struct IntentClassifier {
    groups: Vec<(Intent, RegexSet)>,
}

impl IntentClassifier {
    pub fn new() -> Self {
        let groups = PATTERN_GROUPS
            .iter()
            .map(|(intent, patterns)| {
                let set = RegexSet::new(*patterns)
                    .expect("intent patterns are static and must compile");
                (*intent, set)
            })
            .collect();
        Self { groups }
    }

    /// Classify a query. Pure; unmatched input is always `General`.
    pub fn classify(&self, query: &str) -> Intent {
        for (intent, set) in &self.groups {
            if set.is_match(query) {
                return *intent;
            }
        }
        Intent::General
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Quiz-trigger keywords, checked by the dispatcher before intent
/// classification
pub fn is_quiz_trigger(text: &str) -> bool {
    let lowered = text.to_lowercase();
    ["квиз", "тест", "викторин", "quiz"]
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_patterns() {
        let classifier = IntentClassifier::new();
        assert_eq!(
            classifier.classify("Объясни что такое сила"),
            Intent::ConceptExplanation
        );
        assert_eq!(
            classifier.classify("дай определение импульса"),
            Intent::ConceptExplanation
        );
        assert_eq!(
            classifier.classify("Расскажи про второй закон Ньютона"),
            Intent::ConceptExplanation
        );
    }

    #[test]
    fn test_source_patterns() {
        let classifier = IntentClassifier::new();
        assert_eq!(
            classifier.classify("Посоветуй учебник по механике"),
            Intent::SourceFinding
        );
        assert_eq!(
            classifier.classify("где почитать про оптику"),
            Intent::SourceFinding
        );
    }

    #[test]
    fn test_advice_and_plan_patterns() {
        let classifier = IntentClassifier::new();
        assert_eq!(
            classifier.classify("Как лучше учить физику?"),
            Intent::StudyAdvice
        );
        assert_eq!(
            classifier.classify("составь план подготовки"),
            Intent::StudyPlan
        );
    }

    #[test]
    fn test_notes_patterns() {
        let classifier = IntentClassifier::new();
        assert_eq!(
            classifier.classify("улучши мой конспект"),
            Intent::NotesImprovement
        );
        assert_eq!(
            classifier.classify("как вести конспект"),
            Intent::NotesImprovement
        );
    }

    #[test]
    fn test_unmatched_is_general() {
        let classifier = IntentClassifier::new();
        assert_eq!(classifier.classify("Чему равна масса электрона?"), Intent::General);
        // Questions about the document itself go to retrieval
        assert_eq!(
            classifier.classify("Что означает формула F=ma в моем конспекте?"),
            Intent::General
        );
        assert_eq!(classifier.classify("привет"), Intent::General);
    }

    #[test]
    fn test_priority_concept_beats_lower_groups() {
        let classifier = IntentClassifier::new();
        // Matches both concept ("что такое") and source ("учебник") groups;
        // the earlier group must win
        assert_eq!(
            classifier.classify("что такое импульс и какой учебник посоветуешь"),
            Intent::ConceptExplanation
        );
        // Source beats advice
        assert_eq!(
            classifier.classify("посоветуй литературу и дай совет как готовиться"),
            Intent::SourceFinding
        );
    }

    #[test]
    fn test_classification_is_pure() {
        let classifier = IntentClassifier::new();
        let query = "объясни градиент";
        assert_eq!(classifier.classify(query), classifier.classify(query));
    }

    #[test]
    fn test_quiz_trigger_keywords() {
        assert!(is_quiz_trigger("хочу квиз"));
        assert!(is_quiz_trigger("ТЕСТ по механике"));
        assert!(is_quiz_trigger("сделай quiz"));
        assert!(!is_quiz_trigger("объясни силу"));
    }
}
