use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Default GigaChat OAuth endpoint
pub const DEFAULT_AUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth";

/// Default GigaChat API base URL
pub const DEFAULT_API_URL: &str = "https://gigachat.devices.sberbank.ru/api/v1";

/// Default embedding model (Russian-language BERT, 312-dim)
pub const DEFAULT_EMBEDDING_MODEL: &str = "cointegrated/rubert-tiny2";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub gigachat: GigaChatConfig,
    #[serde(default)]
    pub rag: RagConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather; env `TELEGRAM_BOT_TOKEN` overrides
    pub bot_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GigaChatConfig {
    /// Base64 auth key; env `GIGACHAT_AUTH_KEY` overrides
    pub auth_key: Option<String>,
    /// RqUID client secret; env `GIGACHAT_CLIENT_SECRET` overrides
    pub client_secret: Option<String>,
    pub auth_url: String,
    pub api_url: String,
    pub model: String,
    pub temperature: f64,
    /// OAuth scope for a personal account
    pub scope: String,
}

impl Default for GigaChatConfig {
    fn default() -> Self {
        Self {
            auth_key: None,
            client_secret: None,
            auth_url: DEFAULT_AUTH_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            model: "GigaChat Lite".to_string(),
            temperature: 0.1,
            scope: "GIGACHAT_API_PERS".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Qdrant endpoint holding the per-user collections
    pub qdrant_url: String,
    pub embedding_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Chunks retrieved per question
    pub retriever_k: usize,
    /// Conversation memory budget in estimated tokens
    pub memory_token_limit: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6334".to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chunk_size: 500,
            chunk_overlap: 100,
            retriever_k: 3,
            memory_token_limit: 3000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            telegram: TelegramConfig::default(),
            gigachat: GigaChatConfig::default(),
            rag: RagConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist.
    /// Secrets may come from the environment instead of the file.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            toml::from_str(&contents).context("Failed to parse config file")?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, toml_string).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".studybuddy").join("config.toml"))
    }

    /// Environment variables win over file contents for secrets
    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Ok(key) = std::env::var("GIGACHAT_AUTH_KEY") {
            self.gigachat.auth_key = Some(key);
        }
        if let Ok(secret) = std::env::var("GIGACHAT_CLIENT_SECRET") {
            self.gigachat.client_secret = Some(secret);
        }
    }

    /// Names of required secrets that are still unset
    pub fn missing_secrets(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.gigachat.auth_key.is_none() {
            missing.push("GIGACHAT_AUTH_KEY");
        }
        if self.gigachat.client_secret.is_none() {
            missing.push("GIGACHAT_CLIENT_SECRET");
        }
        if self.telegram.bot_token.is_none() {
            missing.push("TELEGRAM_BOT_TOKEN");
        }
        missing
    }

    /// Fail if any required secret is unset
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_secrets();
        if missing.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("Missing required configuration: {}", missing.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.telegram.bot_token.is_none());
        assert_eq!(config.rag.chunk_size, 500);
        assert_eq!(config.rag.chunk_overlap, 100);
        assert_eq!(config.rag.retriever_k, 3);
        assert_eq!(config.gigachat.temperature, 0.1);
    }

    #[test]
    fn test_missing_secrets_lists_all() {
        let config = Config::default();
        let missing = config.missing_secrets();
        assert!(missing.contains(&"GIGACHAT_AUTH_KEY"));
        assert!(missing.contains(&"GIGACHAT_CLIENT_SECRET"));
        assert!(missing.contains(&"TELEGRAM_BOT_TOKEN"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_passes_when_set() {
        let mut config = Config::default();
        config.telegram.bot_token = Some("123:abc".to_string());
        config.gigachat.auth_key = Some("key".to_string());
        config.gigachat.client_secret = Some("secret".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.gigachat.model = "GigaChat Pro".to_string();

        let toml_string = toml::to_string(&config).unwrap();
        assert!(toml_string.contains("GigaChat Pro"));

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(deserialized.gigachat.model, "GigaChat Pro");
    }
}
