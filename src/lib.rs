//! homebot - personal Telegram bot with alert tracking
//!
//! Follows externally evaluated alerts by URL and tells a fixed set of chat users
//! when an alert fires, keeps firing, resolves or is muted.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`alerts`] - Alert model, fetching, tracking and notification policy
//! - [`notifications`] - Notification queue and delivery channels (Telegram, log)
//! - [`server`] - HTTP webhook ingestion and alert inspection
//! - [`config`] - Configuration management and settings
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use homebot::alerts::{AlertManager, HttpAlertFetcher, MessageRenderer};
//! use homebot::config::Config;
//! use homebot::notifications::Notifier;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let (notifier, _rx) = Notifier::channel(
//!         config.alerts.notify_queue_size,
//!         config.alerts.notify_send_timeout(),
//!     );
//!     let manager = AlertManager::new(
//!         Arc::new(HttpAlertFetcher::new()?),
//!         MessageRenderer::new()?,
//!         notifier,
//!         config.alerts.manager_config(),
//!     );
//!     manager.register_url("http://vmalert:8880/api/v1/alert?group_id=1&alert_id=2").await;
//!     Ok(())
//! }
//! ```

pub mod alerts;
pub mod config;
pub mod error;
pub mod notifications;
pub mod server;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::alerts::{Alert, AlertManager, AlertManagerConfig, NotificationKind};
    pub use crate::config::Config;
    pub use crate::error::{BotErrorTrait, Error, ErrorCategory, Result};
    pub use crate::notifications::{NotificationDispatcher, Notifier};
}

// Direct re-exports for convenience
pub use error::{Error, Result};
