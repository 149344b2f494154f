//! Configuration management for homebot
//!
//! Configuration comes from environment variables or a TOML file. Every section
//! has defaults, so an empty file is a valid configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::alerts::AlertManagerConfig;
use crate::notifications::channels::telegram::DEFAULT_API_URL;
use crate::notifications::TelegramConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub http: HttpConfig,

    /// Alert tracking configuration
    pub alerts: AlertsConfig,

    /// Telegram bot configuration
    pub telegram: TelegramSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Address to bind the server to
    pub bind_address: SocketAddr,

    /// Enable request logging
    pub enable_request_logging: bool,

    /// Enable permissive CORS
    pub enable_cors: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8088)),
            enable_request_logging: true,
            enable_cors: false,
        }
    }
}

/// Alert polling and notification queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Pause between two polls of every tracked alert
    pub poll_interval_ms: u64,

    /// Alert fetch timeout
    pub fetch_timeout_secs: u64,

    /// Reminder interval for critical alerts
    pub reminder_interval_secs: u64,

    /// Capacity of the incoming URL queue
    pub register_queue_size: usize,

    /// Capacity of the outgoing notification queue
    pub notify_queue_size: usize,

    /// How long a notification waits for queue space before it is dropped
    pub notify_send_timeout_ms: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            fetch_timeout_secs: 3,
            reminder_interval_secs: 3 * 60 * 60,
            register_queue_size: 50,
            notify_queue_size: 100,
            notify_send_timeout_ms: 2000,
        }
    }
}

impl AlertsConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    #[must_use]
    pub fn notify_send_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_send_timeout_ms)
    }

    /// Alert manager settings derived from this section
    #[must_use]
    pub fn manager_config(&self) -> AlertManagerConfig {
        AlertManagerConfig {
            poll_interval: self.poll_interval(),
            reminder_interval: i64::try_from(self.reminder_interval_secs)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .unwrap_or(chrono::Duration::MAX),
            register_queue_size: self.register_queue_size,
        }
    }
}

/// Telegram bot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    /// Bot token; notifications go to the log when unset
    pub token: Option<String>,

    /// Bot API base URL
    pub api_url: String,

    /// Message parse mode
    pub parse_mode: String,

    /// Known users by name
    pub users: HashMap<String, i64>,

    /// Names of the users that receive alert notifications
    pub notify_users: Vec<String>,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
            parse_mode: "HTML".to_string(),
            users: HashMap::new(),
            notify_users: Vec::new(),
        }
    }
}

impl TelegramSettings {
    /// Chat ids of `notify_users`; unknown names are logged and skipped
    pub fn notify_chat_ids(&self) -> Vec<i64> {
        self.notify_users
            .iter()
            .filter_map(|name| match self.users.get(name) {
                Some(id) => Some(*id),
                None => {
                    tracing::error!(user = %name, "invalid notify user");
                    None
                }
            })
            .collect()
    }

    /// Channel configuration, if a token is set
    pub fn channel_config(&self) -> Option<TelegramConfig> {
        let token = self.token.as_deref().filter(|t| !t.is_empty())?;

        let config = self
            .notify_chat_ids()
            .into_iter()
            .fold(TelegramConfig::new(token), TelegramConfig::with_chat_id)
            .with_api_url(self.api_url.clone())
            .with_parse_mode(self.parse_mode.clone());

        Some(config)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let bind_address = match std::env::var("HOMEBOT_BIND_ADDRESS") {
            Ok(v) => v
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid HOMEBOT_BIND_ADDRESS: {v}"))?,
            Err(_) => defaults.http.bind_address,
        };

        let token = std::env::var("HOMEBOT_TELEGRAM_TOKEN")
            .or_else(|_| std::env::var("TELEGRAM_TOKEN"))
            .ok()
            .filter(|t| !t.is_empty());

        let users = match std::env::var("HOMEBOT_USERS") {
            Ok(v) => parse_users(&v)?,
            Err(_) => HashMap::new(),
        };

        let notify_users = std::env::var("HOMEBOT_NOTIFY_USERS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            http: HttpConfig {
                bind_address,
                enable_request_logging: env_parse(
                    "HOMEBOT_REQUEST_LOGGING",
                    defaults.http.enable_request_logging,
                ),
                enable_cors: env_parse("HOMEBOT_ENABLE_CORS", defaults.http.enable_cors),
            },
            alerts: AlertsConfig {
                poll_interval_ms: env_parse(
                    "HOMEBOT_POLL_INTERVAL_MS",
                    defaults.alerts.poll_interval_ms,
                ),
                fetch_timeout_secs: env_parse(
                    "HOMEBOT_FETCH_TIMEOUT",
                    defaults.alerts.fetch_timeout_secs,
                ),
                reminder_interval_secs: env_parse(
                    "HOMEBOT_REMINDER_INTERVAL",
                    defaults.alerts.reminder_interval_secs,
                ),
                register_queue_size: env_parse(
                    "HOMEBOT_REGISTER_QUEUE_SIZE",
                    defaults.alerts.register_queue_size,
                ),
                notify_queue_size: env_parse(
                    "HOMEBOT_NOTIFY_QUEUE_SIZE",
                    defaults.alerts.notify_queue_size,
                ),
                notify_send_timeout_ms: env_parse(
                    "HOMEBOT_NOTIFY_SEND_TIMEOUT_MS",
                    defaults.alerts.notify_send_timeout_ms,
                ),
            },
            telegram: TelegramSettings {
                token,
                api_url: std::env::var("HOMEBOT_TELEGRAM_API_URL")
                    .unwrap_or(defaults.telegram.api_url),
                parse_mode: std::env::var("HOMEBOT_TELEGRAM_PARSE_MODE")
                    .unwrap_or(defaults.telegram.parse_mode),
                users,
                notify_users,
            },
            logging: LoggingConfig {
                level: std::env::var("HOMEBOT_LOG_LEVEL").unwrap_or(defaults.logging.level),
                format: std::env::var("HOMEBOT_LOG_FORMAT").unwrap_or(defaults.logging.format),
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` when given, otherwise from the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.alerts.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than 0");
        }

        if self.alerts.fetch_timeout_secs == 0 {
            anyhow::bail!("fetch_timeout_secs must be greater than 0");
        }

        if self.alerts.reminder_interval_secs == 0 {
            anyhow::bail!("reminder_interval_secs must be greater than 0");
        }

        if self.alerts.register_queue_size == 0 || self.alerts.notify_queue_size == 0 {
            anyhow::bail!("queue sizes must be greater than 0");
        }

        if let Some(name) = self
            .telegram
            .notify_users
            .iter()
            .find(|name| !self.telegram.users.contains_key(*name))
        {
            anyhow::bail!("notify user '{name}' is not listed in telegram.users");
        }

        if let Some(telegram) = self.telegram.channel_config() {
            telegram.validate().map_err(anyhow::Error::msg)?;
        }

        Ok(())
    }
}

/// Parse `name=chat_id` pairs separated by commas
fn parse_users(raw: &str) -> Result<HashMap<String, i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, id) = pair
                .split_once('=')
                .with_context(|| format!("Invalid user entry '{pair}', expected name=chat_id"))?;
            let id = id
                .trim()
                .parse::<i64>()
                .with_context(|| format!("Invalid chat id for user '{}'", name.trim()))?;
            Ok((name.trim().to_string(), id))
        })
        .collect()
}
