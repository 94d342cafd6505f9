//! OAuth access-token cache for the GigaChat API.
//!
//! Tokens live for 30 minutes server-side; we refresh after 25. The
//! staleness check is time-based and not serialized across turns, so two
//! concurrent turns may both refresh. That costs one extra request and
//! nothing else.

use crate::errors::{BotError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Refresh margin: tokens older than this are considered stale
const TOKEN_TTL: Duration = Duration::from_secs(25 * 60);

/// Request timeout for the OAuth endpoint
const AUTH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct OAuthResponse {
    access_token: Option<String>,
}

#[derive(Debug)]
struct CachedToken {
    token: String,
    fetched_at: Instant,
}

/// Caching OAuth client for GigaChat
pub struct TokenCache {
    client: Client,
    auth_url: String,
    auth_key: String,
    client_secret: String,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(auth_url: &str, auth_key: &str, client_secret: &str, scope: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(AUTH_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(BotError::Http)?;

        Ok(Self {
            client,
            auth_url: auth_url.to_string(),
            auth_key: auth_key.to_string(),
            client_secret: client_secret.to_string(),
            scope: scope.to_string(),
            cached: Mutex::new(None),
        })
    }

    /// Return a valid access token, refreshing if the cached one is stale
    pub async fn access_token(&self) -> Result<String> {
        {
            let cached = self.cached.lock().await;
            if let Some(entry) = cached.as_ref() {
                if entry.fetched_at.elapsed() <= TOKEN_TTL {
                    return Ok(entry.token.clone());
                }
            }
        }

        let token = self.request_token().await?;

        let mut cached = self.cached.lock().await;
        *cached = Some(CachedToken {
            token: token.clone(),
            fetched_at: Instant::now(),
        });

        tracing::debug!("GigaChat access token refreshed");
        Ok(token)
    }

    async fn request_token(&self) -> Result<String> {
        let response = self
            .client
            .post(&self.auth_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json")
            .header("RqUID", &self.client_secret)
            .header("Authorization", format!("Basic {}", self.auth_key))
            .form(&[("scope", self.scope.as_str())])
            .send()
            .await
            .map_err(|e| BotError::Auth(format!("OAuth request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(BotError::Auth(format!(
                "OAuth endpoint returned HTTP {}",
                response.status()
            )));
        }

        let body: OAuthResponse = response
            .json()
            .await
            .map_err(|e| BotError::Auth(format!("Failed to parse OAuth response: {}", e)))?;

        body.access_token
            .ok_or_else(|| BotError::Auth("OAuth response contains no access_token".to_string()))
    }

    /// Drop the cached token, forcing a refresh on next use
    pub async fn invalidate(&self) {
        let mut cached = self.cached.lock().await;
        *cached = None;
    }
}
