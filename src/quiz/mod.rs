//! Quiz dialogue flow.
//!
//! A two-step dialogue per user: ask for a topic, then for a question
//! count, then generate. The state machine is pure; the dispatcher owns
//! the state map and performs the actual generation when `advance`
//! returns [`QuizStep::Generate`]. A pending state always wins over the
//! trigger keywords, so "сделай тест" typed mid-flow is a topic, not a
//! restart.

use crate::agents::QuizQuestion;

/// Inclusive bounds on the requested question count
pub const MIN_QUESTIONS: usize = 1;
pub const MAX_QUESTIONS: usize = 10;

/// Where a user's quiz dialogue currently stands. A user absent from
/// the state map is not in a quiz flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizState {
    /// Trigger seen, waiting for the user to name a topic
    AwaitingTopic,
    /// Topic captured verbatim, waiting for a question count
    AwaitingCount { topic: String },
}

/// Outcome of feeding one user message into the flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizStep {
    /// Send this text and move to (or stay in) `next`
    Reply { text: String, next: QuizState },
    /// Dialogue complete; generate `count` questions on `topic`
    Generate { topic: String, count: usize },
}

/// Enter the flow after a trigger message. Returns the state to store
/// and the prompt to send.
pub fn start() -> (QuizState, String) {
    (QuizState::AwaitingTopic, topic_prompt())
}

/// Advance the flow with the user's next message.
pub fn advance(state: QuizState, text: &str) -> QuizStep {
    let trimmed = text.trim();
    match state {
        QuizState::AwaitingTopic => {
            if trimmed.is_empty() {
                return QuizStep::Reply {
                    text: topic_prompt(),
                    next: QuizState::AwaitingTopic,
                };
            }
            // The topic is stored verbatim, trigger words included
            QuizStep::Reply {
                text: count_prompt(),
                next: QuizState::AwaitingCount {
                    topic: trimmed.to_string(),
                },
            }
        }
        QuizState::AwaitingCount { topic } => match trimmed.parse::<usize>() {
            Ok(count) if (MIN_QUESTIONS..=MAX_QUESTIONS).contains(&count) => {
                QuizStep::Generate { topic, count }
            }
            _ => QuizStep::Reply {
                text: format!(
                    "Пожалуйста, введите число от {} до {}.",
                    MIN_QUESTIONS, MAX_QUESTIONS
                ),
                next: QuizState::AwaitingCount { topic },
            },
        },
    }
}

fn topic_prompt() -> String {
    "📝 По какой теме составить квиз?\n\n\
Напишите тему из вашего конспекта или «весь», чтобы проверить знания \
по всему материалу."
        .to_string()
}

fn count_prompt() -> String {
    format!(
        "Сколько вопросов сделать? Введите число от {} до {}.",
        MIN_QUESTIONS, MAX_QUESTIONS
    )
}

/// User-facing text when generation produced nothing
pub fn generation_failed_message() -> String {
    "😔 Не удалось составить квиз по этой теме. Возможно, в конспекте \
мало материала по ней. Попробуйте другую тему или «весь»."
        .to_string()
}

/// Render generated questions as one Telegram-ready message
pub fn render_quiz(topic: &str, questions: &[QuizQuestion]) -> String {
    let mut out = format!("📝 <b>Квиз по теме «{}»</b>\n", topic);

    for (index, question) in questions.iter().enumerate() {
        out.push_str(&format!("\n<b>Вопрос {}.</b> {}\n", index + 1, question.question));
        for (option_index, option) in question.options.iter().enumerate() {
            let letter = (b'A' + option_index as u8) as char;
            out.push_str(&format!("{}) {}\n", letter, option));
        }
        if !question.correct_answer.is_empty() {
            out.push_str(&format!(
                "\n<tg-spoiler>✅ Ответ: {}",
                question.correct_answer
            ));
            if !question.explanation.is_empty() {
                out.push_str(&format!("\n💡 {}", question.explanation));
            }
            out.push_str("</tg-spoiler>\n");
        }
    }

    out
}
