//! Telegram transport: long polling, message sending, document download.
//!
//! One `getUpdates` loop; each update is handled in its own task so a
//! slow model call for one user never blocks the others. Replies are
//! sent as HTML and retried as plain text if Telegram rejects the
//! markup.

use crate::errors::{BotError, Result};
use crate::orchestrator::Orchestrator;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Long-poll timeout passed to getUpdates
const POLL_TIMEOUT_SECS: u64 = 30;

/// Pause before retrying after a failed poll
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Telegram caps message text at this many characters
const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Deserialize)]
struct ApiReply<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
    pub document: Option<Document>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    file_path: Option<String>,
}

impl Document {
    fn is_pdf(&self) -> bool {
        if self.mime_type.as_deref() == Some("application/pdf") {
            return true;
        }
        self.file_name
            .as_deref()
            .map(|name| name.to_lowercase().ends_with(".pdf"))
            .unwrap_or(false)
    }
}

/// Long-polling Telegram bot
pub struct TelegramBot {
    client: reqwest::Client,
    api_base: String,
    file_base: String,
    orchestrator: Arc<Orchestrator>,
}

impl TelegramBot {
    pub fn new(bot_token: &str, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: format!("https://api.telegram.org/bot{}", bot_token),
            file_base: format!("https://api.telegram.org/file/bot{}", bot_token),
            orchestrator,
        }
    }

    /// Poll for updates forever, dispatching each to its own task
    pub async fn run(self: Arc<Self>) -> Result<()> {
        tracing::info!("starting long-poll loop");
        let mut offset: i64 = 0;

        loop {
            let updates = match self.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!("getUpdates failed: {}, retrying", e);
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let bot = Arc::clone(&self);
                tokio::spawn(async move {
                    bot.handle_update(update).await;
                });
            }
        }
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let reply: ApiReply<Vec<Update>> = self
            .client
            .post(format!("{}/getUpdates", self.api_base))
            .json(&json!({
                "offset": offset,
                "timeout": POLL_TIMEOUT_SECS,
                "allowed_updates": ["message"],
            }))
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .send()
            .await?
            .json()
            .await?;

        if !reply.ok {
            return Err(BotError::Generic(format!(
                "getUpdates rejected: {}",
                reply.description.unwrap_or_default()
            )));
        }

        Ok(reply.result.unwrap_or_default())
    }

    async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let chat_id = message.chat.id;

        let reply = if let Some(document) = message.document {
            self.handle_document(chat_id, document).await
        } else if let Some(text) = message.text {
            let _ = self.send_chat_action(chat_id, "typing").await;
            self.orchestrator.handle_message(chat_id, &text).await
        } else {
            return;
        };

        if let Err(e) = self.send_message(chat_id, &reply).await {
            tracing::error!(chat_id, "failed to send reply: {}", e);
        }
    }

    async fn handle_document(&self, chat_id: i64, document: Document) -> String {
        if !document.is_pdf() {
            return "📄 Я понимаю только PDF. Отправьте конспект файлом .pdf.".to_string();
        }

        let _ = self.send_chat_action(chat_id, "typing").await;

        let path = match self.download_file(&document.file_id).await {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(chat_id, "document download failed: {}", e);
                return "😔 Не удалось скачать файл. Попробуйте отправить его ещё раз."
                    .to_string();
            }
        };

        let reply = self.orchestrator.handle_document(chat_id, &path).await;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), "temp file cleanup failed: {}", e);
        }

        reply
    }

    /// Resolve a file_id and download it to a temp file
    async fn download_file(&self, file_id: &str) -> Result<PathBuf> {
        let reply: ApiReply<FileInfo> = self
            .client
            .post(format!("{}/getFile", self.api_base))
            .json(&json!({ "file_id": file_id }))
            .send()
            .await?
            .json()
            .await?;

        let ApiReply {
            ok,
            description,
            result,
        } = reply;
        if !ok {
            return Err(BotError::Generic(format!(
                "getFile rejected: {}",
                description.unwrap_or_default()
            )));
        }
        let file_path = result
            .and_then(|info| info.file_path)
            .ok_or_else(|| BotError::Generic("getFile returned no file_path".to_string()))?;

        let bytes = self
            .client
            .get(format!("{}/{}", self.file_base, file_path))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let local = std::env::temp_dir().join(format!("studybuddy-{}.pdf", uuid::Uuid::new_v4()));
        tokio::fs::write(&local, &bytes).await?;
        Ok(local)
    }

    async fn send_chat_action(&self, chat_id: i64, action: &str) -> Result<()> {
        self.client
            .post(format!("{}/sendChatAction", self.api_base))
            .json(&json!({ "chat_id": chat_id, "action": action }))
            .send()
            .await?;
        Ok(())
    }

    /// Send a message, splitting it to fit Telegram's length cap. HTML
    /// markup is dropped on a second attempt if Telegram rejects it.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        for part in split_message(text) {
            if self.send_part(chat_id, &part, Some("HTML")).await.is_err() {
                self.send_part(chat_id, &part, None).await?;
            }
        }
        Ok(())
    }

    async fn send_part(&self, chat_id: i64, text: &str, parse_mode: Option<&str>) -> Result<()> {
        let mut payload = json!({ "chat_id": chat_id, "text": text });
        if let Some(mode) = parse_mode {
            payload["parse_mode"] = json!(mode);
        }

        let reply: ApiReply<serde_json::Value> = self
            .client
            .post(format!("{}/sendMessage", self.api_base))
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if !reply.ok {
            return Err(BotError::Generic(format!(
                "sendMessage rejected: {}",
                reply.description.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

/// Split text into Telegram-sized parts, preferring line boundaries
fn split_message(text: &str) -> Vec<String> {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        if current.chars().count() + line.chars().count() > MAX_MESSAGE_CHARS
            && !current.is_empty()
        {
            parts.push(std::mem::take(&mut current));
        }
        // A single line longer than the cap is hard-cut
        if line.chars().count() > MAX_MESSAGE_CHARS {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(MAX_MESSAGE_CHARS) {
                parts.push(piece.iter().collect());
            }
        } else {
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_detection() {
        let by_mime = Document {
            file_id: "x".to_string(),
            file_name: None,
            mime_type: Some("application/pdf".to_string()),
        };
        assert!(by_mime.is_pdf());

        let by_name = Document {
            file_id: "x".to_string(),
            file_name: Some("Лекции.PDF".to_string()),
            mime_type: None,
        };
        assert!(by_name.is_pdf());

        let other = Document {
            file_id: "x".to_string(),
            file_name: Some("notes.docx".to_string()),
            mime_type: Some("application/msword".to_string()),
        };
        assert!(!other.is_pdf());
    }

    #[test]
    fn test_split_short_message_untouched() {
        let parts = split_message("короткий ответ");
        assert_eq!(parts, vec!["короткий ответ".to_string()]);
    }

    #[test]
    fn test_split_long_message_on_lines() {
        let text = format!("{}\n{}", "а".repeat(3000), "б".repeat(3000));
        let parts = split_message(&text);
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| p.chars().count() <= MAX_MESSAGE_CHARS));
    }

    #[test]
    fn test_split_giant_line_hard_cut() {
        let text = "в".repeat(MAX_MESSAGE_CHARS * 2 + 10);
        let parts = split_message(&text);
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn test_update_deserialization() {
        let raw = r#"{
            "update_id": 100,
            "message": {
                "chat": {"id": 42},
                "text": "привет",
                "document": null
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        assert_eq!(update.update_id, 100);
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, 42);
        assert_eq!(message.text.as_deref(), Some("привет"));
    }
}
