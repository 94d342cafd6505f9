//! Central dispatcher tying transport, routing, agents and sessions
//! together.
//!
//! Every incoming update lands here. The dispatch order for text
//! messages is fixed: commands, then a pending quiz dialogue, then the
//! quiz trigger keywords, then intent classification. Errors never
//! reach the user as raw text; they are logged and replaced with a
//! generic apology.

use crate::agents::{
    Advice, ConceptExplainerAgent, Explanation, QuizAgent, SourceFinderAgent, SourceList,
    StudyAdvisorAgent, StudyPlan,
};
use crate::errors::{BotError, Result};
use crate::index::DocumentIndexer;
use crate::llm::ChatModel;
use crate::quiz::{self, QuizState, QuizStep};
use crate::routing::{is_quiz_trigger, Intent, IntentClassifier};
use crate::session::SessionStore;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;

/// Default timeframe for study plans when the query names none
const DEFAULT_TIMEFRAME: &str = "2 недели";

/// A notes-improvement message at least this long is treated as a pasted
/// notes sample to review rather than a request for general advice
const NOTES_SAMPLE_MIN_CHARS: usize = 400;

/// Top-level message dispatcher
pub struct Orchestrator {
    classifier: IntentClassifier,
    sessions: Arc<SessionStore>,
    indexer: DocumentIndexer,
    concept: ConceptExplainerAgent,
    sources: SourceFinderAgent,
    advisor: StudyAdvisorAgent,
    quiz: QuizAgent,
    question_prefix: Regex,
    timeframe: Regex,
}

impl Orchestrator {
    pub fn new(
        sessions: Arc<SessionStore>,
        indexer: DocumentIndexer,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            sessions,
            indexer,
            concept: ConceptExplainerAgent::new(Arc::clone(&model)),
            sources: SourceFinderAgent::new(Arc::clone(&model)),
            advisor: StudyAdvisorAgent::new(Arc::clone(&model)),
            quiz: QuizAgent::new(model),
            question_prefix: Regex::new(
                r"(?i)^(что\s+такое|что\s+(значит|означает)|объясни(те)?|поясни(те)?|расскажи(те)?\s+(про|об|о)|дай(те)?\s+определение)\s+",
            )
            .expect("static pattern"),
            timeframe: Regex::new(r"(?i)за\s+(\d*\s*[а-яёa-z]+)").expect("static pattern"),
        }
    }

    /// Handle an uploaded document. Always returns user-facing text.
    pub async fn handle_document(&self, user_id: i64, path: &Path) -> String {
        match self.indexer.index(path, user_id).await {
            Ok(report) => {
                // The old session answers from the old document
                self.sessions.reset(user_id).await;
                tracing::info!(user_id, chunks = report.chunks, "document replaced");
                format!(
                    "✅ Конспект загружен и проиндексирован ({} фрагментов).\n\n\
Теперь можно:\n\
• задавать вопросы по конспекту\n\
• просить объяснить концепты\n\
• искать источники и советы по учёбе\n\
• написать «квиз», чтобы проверить знания",
                    report.chunks
                )
            }
            Err(BotError::EmptyDocument) => {
                "😔 Не удалось извлечь текст из файла. Убедитесь, что это PDF \
с текстом, а не со сканами страниц."
                    .to_string()
            }
            Err(e) => {
                tracing::error!(user_id, "document indexing failed: {}", e);
                generic_failure()
            }
        }
    }

    /// Handle a text message. Always returns user-facing text.
    pub async fn handle_message(&self, user_id: i64, text: &str) -> String {
        match self.dispatch(user_id, text).await {
            Ok(reply) => reply,
            Err(e) if e.is_not_indexed() => not_indexed_message(),
            Err(e) => {
                tracing::error!(user_id, "message handling failed: {}", e);
                generic_failure()
            }
        }
    }

    async fn dispatch(&self, user_id: i64, text: &str) -> Result<String> {
        let trimmed = text.trim();

        match trimmed.to_lowercase().as_str() {
            "/start" | "/help" | "help" | "помощь" => return Ok(help_message()),
            "/reset" => {
                self.sessions.reset(user_id).await;
                return Ok("🔄 Диалог сброшен. Конспект остался на месте.".to_string());
            }
            _ => {}
        }

        // A pending quiz dialogue consumes the message before anything
        // else, trigger keywords included
        if let Some(state) = self.sessions.take_quiz_state(user_id).await {
            return self.advance_quiz(user_id, state, trimmed).await;
        }

        if is_quiz_trigger(trimmed) {
            return self.start_quiz(user_id).await;
        }

        let intent = self.classifier.classify(trimmed);
        tracing::debug!(user_id, intent = intent.name(), "query classified");

        // Agent intents generate content directly; retrieval is only for
        // general questions and quiz context
        match intent {
            Intent::ConceptExplanation => {
                let concept = self.candidate_phrase(trimmed);
                let explanation = self.concept.explain(&concept, "").await;
                Ok(format_explanation(&concept, &explanation))
            }
            Intent::SourceFinding => {
                let topic = self.candidate_phrase(trimmed);
                let list = self.sources.find_sources(&topic, "").await;
                Ok(format_sources(&topic, &list))
            }
            Intent::StudyAdvice => {
                if wants_memorization(trimmed) {
                    let advice = self.advisor.memory_techniques().await;
                    Ok(format_advice("Техники запоминания", &advice))
                } else {
                    let advice = self.advisor.study_advice().await;
                    Ok(format_advice("Советы по учёбе", &advice))
                }
            }
            Intent::NotesImprovement => {
                let advice = if trimmed.chars().count() >= NOTES_SAMPLE_MIN_CHARS {
                    // A long message carries a pasted notes sample
                    self.advisor.improve_notes(trimmed).await
                } else {
                    self.advisor.notes_advice("").await
                };
                Ok(format_advice("Работа с конспектом", &advice))
            }
            Intent::StudyPlan => {
                let topic = self.candidate_phrase(trimmed);
                let timeframe = self.extract_timeframe(trimmed);
                let plan = self.advisor.study_plan(&topic, &timeframe, "").await;
                Ok(format_plan(&plan))
            }
            // Unreachable through this dispatch (the trigger check above
            // matches a superset of the quiz patterns); kept so classify()
            // callers outside the dispatcher get the same behavior
            Intent::Quiz => self.start_quiz(user_id).await,
            Intent::General => self.answer_grounded(user_id, trimmed).await,
        }
    }

    /// Grounded Q&A with fallback to concept explanation when the model
    /// admits the document has no answer
    async fn answer_grounded(&self, user_id: i64, question: &str) -> Result<String> {
        let session = self.sessions.session(user_id).await?;
        let answer = session.lock().await.ask(question).await?;

        match answer {
            crate::rag::RagAnswer::Answer(text) => Ok(text),
            crate::rag::RagAnswer::NoAnswer => {
                tracing::debug!(user_id, "no grounded answer, explaining as a concept");
                let concept = self.candidate_phrase(question);
                let explanation = self.concept.explain(&concept, "").await;
                Ok(format!(
                    "📖 В вашем конспекте ответа нет, но вот общее объяснение:\n\n{}",
                    format_explanation(&concept, &explanation)
                ))
            }
        }
    }

    async fn start_quiz(&self, user_id: i64) -> Result<String> {
        // No point entering the dialogue without a document
        let _ = self.sessions.session(user_id).await?;

        let (state, prompt) = quiz::start();
        self.sessions.set_quiz_state(user_id, state).await;
        Ok(prompt)
    }

    async fn advance_quiz(&self, user_id: i64, state: QuizState, text: &str) -> Result<String> {
        match quiz::advance(state, text) {
            QuizStep::Reply { text, next } => {
                self.sessions.set_quiz_state(user_id, next).await;
                Ok(text)
            }
            QuizStep::Generate { topic, count } => {
                // State is already removed; a failure ends the dialogue
                let session = self.sessions.session(user_id).await?;
                let context = session.lock().await.context_for_topic(&topic).await?;

                if context.trim().is_empty() {
                    return Ok(quiz::generation_failed_message());
                }

                let questions = self.quiz.generate(&context, count, Some(&topic)).await;
                if questions.is_empty() {
                    return Ok(quiz::generation_failed_message());
                }

                tracing::info!(user_id, topic = %topic, questions = questions.len(), "quiz generated");
                Ok(quiz::render_quiz(&topic, &questions))
            }
        }
    }

    /// Strip the leading question formula and trailing punctuation to get
    /// the phrase worth explaining
    fn candidate_phrase(&self, query: &str) -> String {
        let stripped = self.question_prefix.replace(query.trim(), "");
        let phrase = stripped.trim_end_matches(['?', '!', '.', ',']).trim();
        if phrase.is_empty() {
            query.trim().to_string()
        } else {
            phrase.to_string()
        }
    }

    fn extract_timeframe(&self, query: &str) -> String {
        self.timeframe
            .captures(query)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| DEFAULT_TIMEFRAME.to_string())
    }
}

/// Advice queries about memorization get the dedicated techniques prompt
fn wants_memorization(text: &str) -> bool {
    let lowered = text.to_lowercase();
    ["запомн", "запомин", "памят", "мнемо"]
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

fn not_indexed_message() -> String {
    "📄 Сначала загрузите PDF с конспектом — просто отправьте файл в этот чат."
        .to_string()
}

fn generic_failure() -> String {
    "😔 Что-то пошло не так. Попробуйте ещё раз чуть позже.".to_string()
}

pub fn help_message() -> String {
    "👋 Я учебный ассистент. Загрузите PDF с конспектом, и я смогу:\n\n\
• отвечать на вопросы по конспекту\n\
• объяснять концепты («что такое сила?»)\n\
• советовать учебники и курсы («посоветуй литературу»)\n\
• давать советы по учёбе и конспектам\n\
• составлять планы подготовки («план на неделю»)\n\
• устраивать квизы — напишите «квиз» или «тест»\n\n\
Команды: /help — эта справка, /reset — сбросить диалог."
        .to_string()
}

fn format_explanation(concept: &str, explanation: &Explanation) -> String {
    let mut out = format!("💡 <b>{}</b>\n\n{}\n", concept, explanation.explanation);
    if !explanation.key_points.is_empty() {
        out.push_str("\n<b>Ключевые моменты:</b>\n");
        for point in &explanation.key_points {
            out.push_str(&format!("• {}\n", point));
        }
    }
    if !explanation.examples.is_empty() {
        out.push_str("\n<b>Примеры:</b>\n");
        for example in &explanation.examples {
            out.push_str(&format!("• {}\n", example));
        }
    }
    if !explanation.study_tips.is_empty() {
        out.push_str("\n<b>Как изучать:</b>\n");
        for tip in &explanation.study_tips {
            out.push_str(&format!("• {}\n", tip));
        }
    }
    out
}

fn format_sources(topic: &str, list: &SourceList) -> String {
    let mut out = format!("📚 <b>Источники по теме «{}»</b>\n", topic);
    for source in &list.sources {
        out.push_str(&format!("\n<b>{}</b>", source.name));
        if !source.kind.is_empty() {
            out.push_str(&format!(" ({})", source.kind));
        }
        if !source.level.is_empty() {
            out.push_str(&format!(", уровень: {}", source.level));
        }
        out.push('\n');
        if !source.description.is_empty() {
            out.push_str(&format!("{}\n", source.description));
        }
        if !source.link.is_empty() {
            out.push_str(&format!("{}\n", source.link));
        }
    }
    if !list.study_path.is_empty() {
        out.push_str("\n<b>Порядок изучения:</b>\n");
        for (index, step) in list.study_path.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", index + 1, step));
        }
    }
    out
}

fn format_advice(title: &str, advice: &Advice) -> String {
    let mut out = format!("🎓 <b>{}</b>\n\n{}\n", title, advice.advice);
    if !advice.quick_tips.is_empty() {
        out.push_str("\n<b>Быстрые советы:</b>\n");
        for tip in &advice.quick_tips {
            out.push_str(&format!("• {}\n", tip));
        }
    }
    if !advice.methods.is_empty() {
        out.push_str("\n<b>Методы:</b>\n");
        for method in &advice.methods {
            out.push_str(&format!("• {}\n", method));
        }
    }
    out
}

fn format_plan(plan: &StudyPlan) -> String {
    let mut out = format!("🗓 <b>План подготовки</b>\n\n{}\n", plan.plan);
    if !plan.milestones.is_empty() {
        out.push_str("\n<b>Контрольные точки:</b>\n");
        for (index, milestone) in plan.milestones.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", index + 1, milestone));
        }
    }
    if !plan.daily_time.is_empty() {
        out.push_str(&format!("\n⏱ В день: {}\n", plan.daily_time));
    }
    out
}
