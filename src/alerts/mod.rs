//! Alert lifecycle tracking
//!
//! This module follows externally evaluated alerts (vmalert / Alertmanager style)
//! by URL, keeps one record per active alert and decides when a human should hear
//! about it again.
//!
//! # Architecture
//!
//! ```text
//!   webhook payload ──▶ AlertManager::submit ──▶ registration worker
//!                                                      │ (one task per URL)
//!                                                      ▼
//!   ┌──────────────┐   fetch    ┌──────────────┐   ┌──────────────┐
//!   │ AlertSource  │◀───────────│ AlertManager │──▶│  AlertStore  │
//!   │ (HTTP GET)   │───────────▶│  poll loop   │   │ url → record │
//!   └──────────────┘  outcome   └──────────────┘   └──────────────┘
//!                                      │
//!                         MessageRenderer (handlebars)
//!                                      │
//!                                      ▼
//!                                  Notifier
//! ```
//!
//! # Lifecycle
//!
//! - **Untracked**: no record for the URL
//! - **Active-Unnotified**: record created, first notice pending
//! - **Active-Notified**: at least one notice sent
//! - **Muted**: overlay on either active state, suppresses every notice
//! - **Resolved**: fetch returned 404 or state `inactive`; final notice, record dropped

pub mod commands;
pub mod fetcher;
pub mod manager;
pub mod record;
pub mod store;
pub mod template;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use fetcher::{AlertSource, FetchError, FetchOutcome, HttpAlertFetcher};
pub use manager::{AlertManager, AlertManagerConfig};
pub use record::{AlertRecord, AlertRecordView};
pub use store::AlertStore;
pub use template::{MessageRenderer, TemplateError};

/// State reported by the source while the alert condition holds
pub const STATE_FIRING: &str = "firing";

/// State reported by the source once the condition cleared
pub const STATE_INACTIVE: &str = "inactive";

/// Severity label value that enables reminders
pub const SEVERITY_CRITICAL: &str = "critical";

/// Alert annotations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
}

/// Snapshot of one alert as returned by the source
///
/// Replaced wholesale on every successful fetch. Unknown `state` values are kept
/// as-is and simply never count as firing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Source-assigned identifier, stable across re-fetches
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub expression: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(rename = "activeAt", default, skip_serializing_if = "Option::is_none")]
    pub active_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Human-facing title: the summary annotation, falling back to the name
    pub fn title(&self) -> &str {
        if self.annotations.summary.is_empty() {
            &self.name
        } else {
            &self.annotations.summary
        }
    }

    /// Value of the `severity` label, if any
    pub fn severity(&self) -> Option<&str> {
        self.labels.get("severity").map(String::as_str)
    }

    /// Check if the condition is currently firing
    pub fn is_firing(&self) -> bool {
        self.state == STATE_FIRING
    }

    /// Check if the source reports the condition as cleared
    pub fn is_inactive(&self) -> bool {
        self.state == STATE_INACTIVE
    }

    /// Check if reminders apply to this alert
    pub fn is_critical(&self) -> bool {
        self.severity() == Some(SEVERITY_CRITICAL)
    }
}

/// Kind of notification sent for an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// First notice for a newly tracked firing alert
    New,
    /// Repeated notice for a still-firing critical alert
    Reminder,
    /// The alert disappeared upstream (404)
    Resolved,
    /// The source reports the alert as inactive
    Inactive,
}

impl NotificationKind {
    /// All kinds, in template registration order
    pub const ALL: [NotificationKind; 4] = [Self::New, Self::Reminder, Self::Resolved, Self::Inactive];

    /// Get string representation (also the template name)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Reminder => "reminder",
            Self::Resolved => "resolved",
            Self::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown notification kind: {s}"))
    }
}
