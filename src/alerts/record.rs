//! Tracked alert record
//!
//! One record exists per actively tracked alert URL. The URL and creation time never
//! change; everything else lives behind a per-record `RwLock`, so the poll loop and
//! mute requests can touch the same record concurrently.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Alert, NotificationKind};

/// Mutable part of a record
#[derive(Debug)]
struct RecordState {
    alert: Alert,
    last_notified: Option<DateTime<Utc>>,
    muted: bool,
    fresh: bool,
}

/// A tracked alert plus its notification bookkeeping
#[derive(Debug)]
pub struct AlertRecord {
    url: String,
    created_at: DateTime<Utc>,
    state: RwLock<RecordState>,
}

/// Serializable view of a record, used by the list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecordView {
    pub alert: Alert,
    pub url: String,
    pub created: DateTime<Utc>,
    pub last_notify: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub muted: bool,
}

impl AlertRecord {
    /// Create a fresh, never-notified record
    pub fn new(url: impl Into<String>, alert: Alert) -> Self {
        Self {
            url: url.into(),
            created_at: Utc::now(),
            state: RwLock::new(RecordState {
                alert,
                last_notified: None,
                muted: false,
                fresh: true,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RecordState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RecordState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Source URL, the record's identity
    pub fn url(&self) -> &str {
        &self.url
    }

    /// When tracking started
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Latest alert snapshot
    pub fn alert(&self) -> Alert {
        self.read().alert.clone()
    }

    /// Identifier of the latest snapshot
    pub fn alert_id(&self) -> String {
        self.read().alert.id.clone()
    }

    /// State string of the latest snapshot
    pub fn state(&self) -> String {
        self.read().alert.state.clone()
    }

    /// Replace the snapshot, returning the previous one
    pub fn replace_alert(&self, alert: Alert) -> Alert {
        std::mem::replace(&mut self.write().alert, alert)
    }

    /// Mark the record as notified at `now`
    pub fn mark_notified(&self, now: DateTime<Utc>) {
        let mut state = self.write();
        state.last_notified = Some(now);
        state.fresh = false;
    }

    /// Suppress every further notification. There is no way back.
    pub fn mute(&self) {
        self.write().muted = true;
    }

    pub fn is_muted(&self) -> bool {
        self.read().muted
    }

    /// True until the first notification went out
    pub fn is_fresh(&self) -> bool {
        self.read().fresh
    }

    pub fn last_notified(&self) -> Option<DateTime<Utc>> {
        self.read().last_notified
    }

    /// Decide whether an active record should be announced at `now`
    ///
    /// Returns `New` for a never-notified firing alert, `Reminder` for a critical
    /// firing alert whose last notice is older than `reminder_interval`, and `None`
    /// for muted or non-firing records.
    pub fn pending_notification(
        &self,
        now: DateTime<Utc>,
        reminder_interval: Duration,
    ) -> Option<NotificationKind> {
        decide(&self.read(), now, reminder_interval)
    }

    /// Atomically decide, render and mark an active-state notification
    ///
    /// The record stays write-locked for the whole step, so two callers can never
    /// both announce the same alert. `render` returning `None` leaves the record
    /// untouched.
    pub fn take_notification<F>(
        &self,
        now: DateTime<Utc>,
        reminder_interval: Duration,
        render: F,
    ) -> Option<(NotificationKind, String)>
    where
        F: FnOnce(&Alert, NotificationKind) -> Option<String>,
    {
        let mut state = self.write();
        let kind = decide(&state, now, reminder_interval)?;
        let message = render(&state.alert, kind)?;

        state.last_notified = Some(now);
        state.fresh = false;

        Some((kind, message))
    }

    /// Snapshot for serialization
    pub fn view(&self) -> AlertRecordView {
        let state = self.read();

        AlertRecordView {
            alert: state.alert.clone(),
            url: self.url.clone(),
            created: self.created_at,
            last_notify: state.last_notified,
            muted: state.muted,
        }
    }
}

fn decide(
    state: &RecordState,
    now: DateTime<Utc>,
    reminder_interval: Duration,
) -> Option<NotificationKind> {
    if state.muted || !state.alert.is_firing() {
        return None;
    }

    if state.fresh {
        return Some(NotificationKind::New);
    }

    if !state.alert.is_critical() {
        return None;
    }

    match state.last_notified {
        Some(last) if now - last > reminder_interval => Some(NotificationKind::Reminder),
        Some(_) => None,
        None => Some(NotificationKind::Reminder),
    }
}

impl fmt::Display for AlertRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();

        if state.muted {
            write!(f, "[muted] ")?;
        }

        write!(
            f,
            "{}, state: {}, severity: {}",
            state.alert.title(),
            state.alert.state,
            state.alert.severity().unwrap_or_default()
        )
    }
}
