//! Log-only channel, used when no chat transport is configured

use async_trait::async_trait;

use super::{Channel, ChannelResult, DeliveryStatus};

/// Writes every message to the log at `info` level
#[derive(Debug, Default)]
pub struct LogChannel;

impl LogChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Channel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &str) -> ChannelResult<DeliveryStatus> {
        tracing::info!(target: "homebot::notify", "{message}");
        Ok(DeliveryStatus::success("log"))
    }

    async fn send_to_chat(&self, chat_id: i64, message: &str) -> ChannelResult<DeliveryStatus> {
        tracing::info!(target: "homebot::notify", chat_id, "{message}");
        Ok(DeliveryStatus::success("log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_channel_always_succeeds() {
        let status = LogChannel::new().send("hello").await.unwrap();
        assert!(status.success);
        assert_eq!(status.channel, "log");

        let status = LogChannel::new().send_to_chat(7, "hello").await.unwrap();
        assert!(status.success);
        assert!(LogChannel::new().health_check().await.unwrap());
    }
}
