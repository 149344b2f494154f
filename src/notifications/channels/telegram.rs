//! Telegram notification channel
//!
//! Delivers messages through the Bot API `sendMessage` method to every configured
//! recipient chat.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Channel, ChannelError, ChannelResult, DeliveryStatus};

/// Public Bot API endpoint
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Telegram channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token
    pub token: String,
    /// Bot API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Message parse mode (`HTML`, `MarkdownV2`)
    #[serde(default = "default_parse_mode")]
    pub parse_mode: String,
    /// Recipient chat ids
    #[serde(default)]
    pub chat_ids: Vec<i64>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_parse_mode() -> String {
    "HTML".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl TelegramConfig {
    /// Create a configuration for the given bot token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: default_api_url(),
            parse_mode: default_parse_mode(),
            chat_ids: Vec::new(),
            timeout_secs: default_timeout(),
        }
    }

    /// Set the Bot API base URL
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Add a recipient chat
    pub fn with_chat_id(mut self, chat_id: i64) -> Self {
        self.chat_ids.push(chat_id);
        self
    }

    /// Set the parse mode
    pub fn with_parse_mode(mut self, parse_mode: impl Into<String>) -> Self {
        self.parse_mode = parse_mode.into();
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.token.is_empty() {
            return Err("Telegram token cannot be empty".to_string());
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err("Telegram API URL must start with http:// or https://".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Telegram Bot API channel
///
/// Sends one `sendMessage` request per recipient:
///
/// ```json
/// { "chat_id": 123456, "text": "...", "parse_mode": "HTML" }
/// ```
pub struct TelegramChannel {
    config: TelegramConfig,
    client: Client,
}

impl TelegramChannel {
    /// Create a new Telegram channel
    pub fn new(config: TelegramConfig) -> ChannelResult<Self> {
        config.validate().map_err(ChannelError::InvalidConfig)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChannelError::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Recipient chat ids
    pub fn chat_ids(&self) -> &[i64] {
        &self.config.chat_ids
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_url.trim_end_matches('/'),
            self.config.token
        )
    }

    fn build_payload(&self, chat_id: i64, message: &str) -> serde_json::Value {
        serde_json::json!({
            "chat_id": chat_id,
            "text": message,
            "parse_mode": self.config.parse_mode,
        })
    }

    async fn post_message(&self, chat_id: i64, message: &str) -> ChannelResult<()> {
        // Request URLs carry the bot token
        let response = self
            .client
            .post(self.send_message_url())
            .json(&self.build_payload(chat_id, message))
            .send()
            .await
            .map_err(|e| ChannelError::HttpError(e.without_url()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());

        if status.as_u16() == 429 {
            return Err(ChannelError::RateLimited(body));
        }

        Err(ChannelError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, message: &str) -> ChannelResult<DeliveryStatus> {
        let results = futures::future::join_all(
            self.config
                .chat_ids
                .iter()
                .map(|&chat_id| async move { (chat_id, self.post_message(chat_id, message).await) }),
        )
        .await;

        let mut failed = Vec::new();
        for (chat_id, result) in results {
            if let Err(e) = result {
                tracing::error!(chat_id, error = %e, "can't send telegram message");
                failed.push(format!("{chat_id}: {e}"));
            }
        }

        if failed.is_empty() {
            Ok(DeliveryStatus::success_with_message(
                "telegram",
                format!("Sent to {} chats", self.config.chat_ids.len()),
            ))
        } else {
            Ok(DeliveryStatus::failure("telegram", failed.join("; ")))
        }
    }

    async fn send_to_chat(&self, chat_id: i64, message: &str) -> ChannelResult<DeliveryStatus> {
        self.post_message(chat_id, message).await?;
        Ok(DeliveryStatus::success_with_message(
            "telegram",
            format!("Sent to chat {chat_id}"),
        ))
    }

    async fn health_check(&self) -> ChannelResult<bool> {
        let url = format!(
            "{}/bot{}/getMe",
            self.config.api_url.trim_end_matches('/'),
            self.config.token
        );

        match self.client.get(url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!(error = %e.without_url(), "Telegram health check failed");
                Ok(false)
            }
        }
    }
}
