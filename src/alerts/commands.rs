//! Chat commands that act on tracked alerts

use super::manager::AlertManager;

/// Prefix of the line that carries the alert id in every notification
pub const ID_PREFIX: &str = "id:";

/// Reply when nothing is tracked
pub const NO_ACTIVE_ALERTS: &str = "no active alerts";

/// Reply when a mute target is not tracked
pub const ALERT_NOT_FOUND: &str = "alert is not found";

/// Alert command parsed from a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCommand {
    /// List tracked alerts
    List,
    /// Mute the alert quoted in the replied-to message
    Mute,
}

impl AlertCommand {
    /// Parse the first word of `text`
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?.to_lowercase();

        match word.as_str() {
            "alerts" | "алерты" => Some(Self::List),
            "mute" | "выкл" => Some(Self::Mute),
            _ => None,
        }
    }

    /// Run the command; `None` means no reply should be sent
    pub fn execute(self, manager: &AlertManager, replied_to: Option<&str>) -> Option<String> {
        match self {
            Self::List => Some(list(manager)),
            Self::Mute => {
                let id = replied_to.and_then(extract_alert_id)?;
                Some(mute(manager, id))
            }
        }
    }
}

/// Alert id from the last `id:` line of a notification text
pub fn extract_alert_id(text: &str) -> Option<&str> {
    text.lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix(ID_PREFIX))
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

fn list(manager: &AlertManager) -> String {
    let mut lines = Vec::new();
    manager.for_each(|record| {
        lines.push(record.to_string());
        true
    });

    if lines.is_empty() {
        NO_ACTIVE_ALERTS.to_string()
    } else {
        lines.join("\n")
    }
}

fn mute(manager: &AlertManager, id: &str) -> String {
    match manager.find_and_mute(id) {
        Some(record) => format!("alert {} is muted", record.alert().name),
        None => ALERT_NOT_FOUND.to_string(),
    }
}
