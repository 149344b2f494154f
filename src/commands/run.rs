use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use homebot::alerts::{AlertManager, HttpAlertFetcher, MessageRenderer};
use homebot::config::Config;
use homebot::error::Result;
use homebot::notifications::{
    Channel, LogChannel, NotificationDispatcher, Notifier, TelegramChannel,
};
use homebot::server::{AppState, HttpServer};

/// How long queued notifications may drain after shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the bot until Ctrl+C
pub async fn run(config: Config) -> Result<()> {
    let (notifier, rx) = Notifier::channel(
        config.alerts.notify_queue_size,
        config.alerts.notify_send_timeout(),
    );

    let mut dispatcher = NotificationDispatcher::new(rx);
    let direct: Arc<dyn Channel> = match config.telegram.channel_config() {
        Some(telegram) => {
            tracing::info!(chats = telegram.chat_ids.len(), "telegram notifications enabled");
            dispatcher.add_channel(Box::new(TelegramChannel::new(telegram.clone())?));
            Arc::new(TelegramChannel::new(telegram)?)
        }
        None => {
            tracing::warn!("no telegram token configured, notifications go to the log");
            dispatcher.add_channel(Box::new(LogChannel::new()));
            Arc::new(LogChannel::new())
        }
    };
    let dispatcher = tokio::spawn(dispatcher.run());

    let source = Arc::new(HttpAlertFetcher::with_timeout(config.alerts.fetch_timeout())?);
    let manager = Arc::new(AlertManager::new(
        source,
        MessageRenderer::new()?,
        notifier.clone(),
        config.alerts.manager_config(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let manager_tasks = manager.start(shutdown_rx);

    let server = HttpServer::new(
        config.http.clone(),
        AppState::new(Arc::clone(&manager), notifier)
            .with_direct(direct, config.telegram.users.clone()),
    );

    println!("homebot {}", env!("CARGO_PKG_VERSION"));
    println!("  Bind Address: {}", server.bind_address());
    println!("  Poll Interval: {}ms", config.alerts.poll_interval_ms);
    println!("  Reminder Interval: {}s", config.alerts.reminder_interval_secs);
    println!("Press Ctrl+C to stop.\n");

    let served = server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await;

    if shutdown_tx.send(true).is_err() {
        tracing::debug!("alert tasks already stopped");
    }
    if let Err(e) = manager_tasks.await {
        tracing::error!(error = %e, "alert tasks failed");
    }

    drop(server);
    drop(manager);

    if tokio::time::timeout(DRAIN_TIMEOUT, dispatcher).await.is_err() {
        tracing::warn!("notification queue not drained before shutdown");
    }

    served?;
    println!("homebot stopped.");
    Ok(())
}
