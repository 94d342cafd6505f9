//! GigaChat chat-completion client.

use crate::config::GigaChatConfig;
use crate::errors::{BotError, Result};
use crate::llm::token::TokenCache;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Request timeout; generation can be slow on long prompts
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Seam between the bot and the language model.
///
/// Production uses [`GigaChatClient`]; tests inject scripted
/// implementations.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one prompt through the model and return the raw answer text
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// HTTP client for the GigaChat chat-completions endpoint
pub struct GigaChatClient {
    client: reqwest::Client,
    tokens: Arc<TokenCache>,
    api_url: String,
    model: String,
    temperature: f64,
}

impl GigaChatClient {
    pub fn new(config: &GigaChatConfig, tokens: Arc<TokenCache>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(BotError::Http)?;

        Ok(Self {
            client,
            tokens,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// Check that the API answers with the current token
    pub async fn health_check(&self) -> Result<bool> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/models", self.api_url);

        match self
            .client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Get current model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for GigaChatClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/chat/completions", self.api_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await
            .map_err(|e| BotError::Llm(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BotError::Llm(format!("HTTP {}: {}", status, error_text)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| BotError::Llm(format!("Failed to parse response: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| BotError::Llm("Response contains no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GigaChatConfig;

    fn test_client() -> GigaChatClient {
        let config = GigaChatConfig::default();
        let tokens = Arc::new(
            TokenCache::new(&config.auth_url, "key", "secret", &config.scope).unwrap(),
        );
        GigaChatClient::new(&config, tokens).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = test_client();
        assert_eq!(client.model(), "GigaChat Lite");
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "GigaChat Lite".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "Привет".to_string(),
            }],
            temperature: 0.1,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("Привет"));
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"ответ"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "ответ");
    }

    #[tokio::test]
    #[ignore] // Requires GigaChat credentials
    async fn test_health_check_integration() {
        let client = test_client();
        let _ = client.health_check().await;
    }
}
