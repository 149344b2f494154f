//! Alert manager: registration, polling and notification policy

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::fetcher::{AlertSource, FetchOutcome};
use super::record::{AlertRecord, AlertRecordView};
use super::store::AlertStore;
use super::template::MessageRenderer;
use super::{Alert, NotificationKind};
use crate::notifications::Notifier;

/// Alert manager tuning
#[derive(Debug, Clone)]
pub struct AlertManagerConfig {
    /// Pause between two full scans of the store
    pub poll_interval: Duration,

    /// Minimum gap between reminders for a still-firing critical alert
    pub reminder_interval: chrono::Duration,

    /// Capacity of the incoming URL queue
    pub register_queue_size: usize,
}

impl Default for AlertManagerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            reminder_interval: chrono::Duration::hours(3),
            register_queue_size: 50,
        }
    }
}

/// Tracks alerts by URL and notifies when policy says so
///
/// The manager owns its [`AlertStore`]. A background poll task re-fetches every
/// tracked alert once per interval; new URLs arrive through [`submit`] and are
/// registered on their own tasks so a slow source cannot hold up ingestion.
///
/// [`submit`]: AlertManager::submit
pub struct AlertManager {
    store: Arc<AlertStore>,
    source: Arc<dyn AlertSource>,
    renderer: MessageRenderer,
    notifier: Notifier,
    config: AlertManagerConfig,
    register_tx: mpsc::Sender<String>,
    register_rx: Mutex<Option<mpsc::Receiver<String>>>,
}

impl AlertManager {
    /// Create a new manager
    pub fn new(
        source: Arc<dyn AlertSource>,
        renderer: MessageRenderer,
        notifier: Notifier,
        config: AlertManagerConfig,
    ) -> Self {
        let (register_tx, register_rx) = mpsc::channel(config.register_queue_size.max(1));

        Self {
            store: Arc::new(AlertStore::new()),
            source,
            renderer,
            notifier,
            config,
            register_tx,
            register_rx: Mutex::new(Some(register_rx)),
        }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<AlertStore> {
        &self.store
    }

    /// Manager configuration
    pub fn config(&self) -> &AlertManagerConfig {
        &self.config
    }

    /// Number of tracked alerts
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Queue a URL for registration without waiting for the fetch
    ///
    /// Returns `false` when the queue is full or the manager is gone; the URL is
    /// dropped in that case.
    pub fn submit(&self, url: impl Into<String>) -> bool {
        let url = url.into();

        match self.register_tx.try_send(url) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(url)) => {
                tracing::warn!(url = %url, "registration queue full, dropping alert url");
                false
            }
            Err(mpsc::error::TrySendError::Closed(url)) => {
                tracing::warn!(url = %url, "registration worker stopped, dropping alert url");
                false
            }
        }
    }

    /// Start tracking `url`
    ///
    /// Fetches the alert right away. A record is created only for an alert that
    /// exists and is not inactive; it is announced immediately when firing.
    /// Returns whether a new record was created. Fetch errors are logged and not
    /// retried on this path.
    pub async fn register_url(&self, url: &str) -> bool {
        if !self.store.register(url) {
            tracing::debug!(url = %url, "alert url already tracked");
            return false;
        }

        tracing::info!(url = %url, "new alert");

        let alert = match self.source.fetch(url).await {
            Ok(FetchOutcome::Found(alert)) if !alert.is_inactive() => alert,
            Ok(FetchOutcome::Found(alert)) => {
                tracing::info!(url = %url, alert_id = %alert.id, "alert already inactive, not tracking");
                self.store.delete(url);
                return false;
            }
            Ok(FetchOutcome::NotFound) => {
                tracing::info!(url = %url, "alert not found, not tracking");
                self.store.delete(url);
                return false;
            }
            Err(e) => {
                tracing::error!(url = %url, error = %e, "error getting alert");
                self.store.delete(url);
                return false;
            }
        };

        let record = Arc::new(AlertRecord::new(url, alert));
        self.store.put(url, Arc::clone(&record));
        tracing::info!(url = %url, "{record}");

        self.notify_if_due(&record, Utc::now()).await;
        true
    }

    /// Run one poll tick now
    pub async fn poll_once(&self) {
        self.poll_at(Utc::now()).await;
    }

    /// Run one poll tick, evaluating timing policy against `now`
    ///
    /// Records are processed one after another; a failure for one alert never
    /// affects the others.
    pub async fn poll_at(&self, now: DateTime<Utc>) {
        for record in self.store.records() {
            self.process(&record, now).await;
        }
    }

    async fn process(&self, record: &Arc<AlertRecord>, now: DateTime<Utc>) {
        let url = record.url();

        match self.source.fetch(url).await {
            Err(e) => {
                tracing::error!(url = %url, error = %e, "error getting alert");
            }
            Ok(FetchOutcome::NotFound) => {
                if !self.store.delete_record(record) {
                    return;
                }
                tracing::info!(url = %url, "remove alert (404)");

                if record.alert().is_inactive() {
                    record.mark_notified(now);
                } else {
                    self.notify_final(record, NotificationKind::Resolved, now).await;
                }
            }
            Ok(FetchOutcome::Found(alert)) => {
                let inactive = alert.is_inactive();
                let new_state = alert.state.clone();
                let old = record.replace_alert(alert);

                if old.state != new_state {
                    tracing::info!(
                        url = %url,
                        alert_id = %old.id,
                        "alert {} {} -> {}",
                        old.name,
                        old.state,
                        new_state
                    );
                }

                if inactive {
                    if self.store.delete_record(record) {
                        tracing::info!(url = %url, "alert inactive, removed");
                        self.notify_final(record, NotificationKind::Inactive, now).await;
                    }
                    return;
                }

                self.notify_if_due(record, now).await;
            }
        }
    }

    async fn notify_if_due(&self, record: &AlertRecord, now: DateTime<Utc>) {
        let taken = record.take_notification(now, self.config.reminder_interval, |alert, kind| {
            self.render(alert, kind)
        });

        if let Some((kind, message)) = taken {
            tracing::info!(url = %record.url(), kind = %kind, "sending alert notification");
            self.notifier.notify(message).await;
        }
    }

    async fn notify_final(&self, record: &AlertRecord, kind: NotificationKind, now: DateTime<Utc>) {
        if record.is_muted() {
            tracing::debug!(url = %record.url(), kind = %kind, "alert muted, skipping notification");
            return;
        }

        if let Some(message) = self.render(&record.alert(), kind) {
            record.mark_notified(now);
            tracing::info!(url = %record.url(), kind = %kind, "sending alert notification");
            self.notifier.notify(message).await;
        }
    }

    fn render(&self, alert: &Alert, kind: NotificationKind) -> Option<String> {
        match self.renderer.render(alert, kind) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::error!(alert_id = %alert.id, error = %e, "error in template");
                None
            }
        }
    }

    /// Mute the first tracked record whose alert id is `id`
    pub fn find_and_mute(&self, id: &str) -> Option<Arc<AlertRecord>> {
        let mut found = None;

        self.store.for_each(|record| {
            if record.alert_id() != id {
                return true;
            }

            record.mute();
            found = Some(Arc::clone(record));
            false
        });

        match &found {
            Some(record) => tracing::info!(alert_id = %id, url = %record.url(), "alert muted"),
            None => tracing::info!(alert_id = %id, "no tracked alert to mute"),
        }

        found
    }

    /// Mute by alert id; returns whether a record matched
    pub fn mute_by_id(&self, id: &str) -> bool {
        self.find_and_mute(id).is_some()
    }

    /// Visit tracked records until `visit` returns `false`
    pub fn for_each<F>(&self, visit: F)
    where
        F: FnMut(&Arc<AlertRecord>) -> bool,
    {
        self.store.for_each(visit);
    }

    /// Serializable views of all tracked records
    pub fn snapshot(&self) -> Vec<AlertRecordView> {
        let mut views = Vec::with_capacity(self.store.len());
        self.store.for_each(|record| {
            views.push(record.view());
            true
        });
        views
    }

    /// Spawn the poll loop and the registration worker
    ///
    /// Both stop when `shutdown` turns `true` or its sender is dropped. The
    /// returned handle completes once both have stopped.
    pub fn start(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let poller = tokio::spawn(Arc::clone(self).run_poller(shutdown.clone()));
        let registrar = tokio::spawn(Arc::clone(self).run_registrar(shutdown));

        tokio::spawn(async move {
            if let Err(e) = poller.await {
                tracing::error!(error = %e, "alert poller task failed");
            }
            if let Err(e) = registrar.await {
                tracing::error!(error = %e, "alert registration task failed");
            }
        })
    }

    async fn run_poller(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "alert poller started"
        );

        while !*shutdown.borrow() {
            self.poll_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("alert poller stopped");
    }

    async fn run_registrar(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let rx = self
            .register_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(mut rx) = rx else {
            tracing::warn!("alert registration worker already running");
            return;
        };

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                url = rx.recv() => {
                    let Some(url) = url else { break };
                    let manager = Arc::clone(&self);
                    tokio::spawn(async move {
                        manager.register_url(&url).await;
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("alert registration worker stopped");
    }
}

impl std::fmt::Debug for AlertManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertManager")
            .field("tracked", &self.store.len())
            .field("config", &self.config)
            .finish()
    }
}
