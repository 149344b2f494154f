//! Outbound notification delivery
//!
//! Rendered messages are handed from the alert manager (and the HTTP relay
//! endpoints) to a bounded queue. A single dispatcher task drains the queue and
//! fans every message out to the registered channels.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  notify()   ┌───────────────┐   ┌────────────────────────┐
//! │ AlertManager │────────────▶│ bounded queue │──▶│ NotificationDispatcher │
//! │ HTTP relay   │  (timeout)  └───────────────┘   └────────────────────────┘
//! └──────────────┘                                         │
//!                                             ┌────────────┴────────────┐
//!                                             ▼                         ▼
//!                                      ┌─────────────┐           ┌─────────────┐
//!                                      │  Telegram   │           │     Log     │
//!                                      │   Channel   │           │   Channel   │
//!                                      └─────────────┘           └─────────────┘
//! ```
//!
//! # Backpressure
//!
//! `Notifier::notify` waits at most the configured send timeout for queue space,
//! then drops the message with a warning. Delivery is at-most-once.
//!
//! # Example
//!
//! ```rust,ignore
//! use homebot::notifications::{Notifier, NotificationDispatcher, LogChannel};
//!
//! let (notifier, rx) = Notifier::channel(100, Duration::from_secs(2));
//! let dispatcher = NotificationDispatcher::new(rx).with_channel(Box::new(LogChannel::new()));
//! tokio::spawn(dispatcher.run());
//!
//! notifier.notify("hello".to_string()).await;
//! ```

pub mod channels;

use std::time::Duration;
use tokio::sync::mpsc;

// Re-exports
pub use channels::log::LogChannel;
pub use channels::telegram::{TelegramChannel, TelegramConfig};
pub use channels::{Channel, ChannelError, DeliveryStatus};

/// Default wait for queue space before a message is dropped
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Result of handing a message to the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// Message accepted by the queue
    Queued,
    /// Queue stayed full for the whole send timeout
    DroppedFull,
    /// Dispatcher is gone
    DroppedClosed,
}

/// Cloneable handle used to push rendered messages to the dispatcher
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<String>,
    send_timeout: Duration,
}

impl Notifier {
    /// Create a notifier and the receiving end of its queue
    pub fn channel(capacity: usize, send_timeout: Duration) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, send_timeout }, rx)
    }

    /// Queue a message for delivery
    pub async fn notify(&self, message: String) -> Enqueued {
        match tokio::time::timeout(self.send_timeout, self.tx.send(message)).await {
            Ok(Ok(())) => Enqueued::Queued,
            Ok(Err(_)) => {
                tracing::warn!("notification dispatcher stopped, dropping message");
                Enqueued::DroppedClosed
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.send_timeout.as_millis() as u64,
                    "notification queue full, dropping message"
                );
                Enqueued::DroppedFull
            }
        }
    }
}

/// Drains the notification queue and delivers through every channel
pub struct NotificationDispatcher {
    rx: mpsc::Receiver<String>,
    channels: Vec<Box<dyn Channel>>,
}

impl NotificationDispatcher {
    /// Create a dispatcher without channels
    pub fn new(rx: mpsc::Receiver<String>) -> Self {
        Self {
            rx,
            channels: Vec::new(),
        }
    }

    /// Add a delivery channel
    pub fn with_channel(mut self, channel: Box<dyn Channel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Add a delivery channel
    pub fn add_channel(&mut self, channel: Box<dyn Channel>) {
        self.channels.push(channel);
    }

    /// Names of the registered channels
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Deliver one message through every channel
    pub async fn deliver(&self, message: &str) -> Vec<DeliveryStatus> {
        let mut statuses = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let status = match channel.send(message).await {
                Ok(status) => status,
                Err(e) => DeliveryStatus::failure(channel.name(), e.to_string()),
            };

            if !status.success {
                tracing::error!(channel = channel.name(), "{status}");
            }

            statuses.push(status);
        }

        statuses
    }

    /// Probe every channel once; returns the names of unhealthy channels
    pub async fn check_channels(&self) -> Vec<String> {
        let mut unhealthy = Vec::new();

        for channel in &self.channels {
            match channel.health_check().await {
                Ok(true) => tracing::debug!(channel = channel.name(), "channel healthy"),
                Ok(false) => {
                    tracing::warn!(channel = channel.name(), "channel health check failed");
                    unhealthy.push(channel.name().to_string());
                }
                Err(e) => {
                    tracing::warn!(channel = channel.name(), error = %e, "channel health check failed");
                    unhealthy.push(channel.name().to_string());
                }
            }
        }

        unhealthy
    }

    /// Run until every `Notifier` handle is dropped
    pub async fn run(mut self) {
        tracing::info!(channels = ?self.channel_names(), "notification dispatcher started");
        self.check_channels().await;

        while let Some(message) = self.rx.recv().await {
            self.deliver(&message).await;
        }

        tracing::info!("notification dispatcher stopped");
    }
}
