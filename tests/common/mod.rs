//! Common test utilities

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use homebot::alerts::{
    Alert, AlertManager, AlertManagerConfig, AlertSource, FetchError, FetchOutcome,
    MessageRenderer,
};
use homebot::notifications::Notifier;

/// One scripted answer of the alert source
#[derive(Debug, Clone)]
pub enum Step {
    Found(Alert),
    NotFound,
    Fail,
}

/// In-memory alert source answering from per-URL scripts
///
/// Steps are consumed in order; the last step of a script repeats forever.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

#[allow(dead_code)]
impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before answering every fetch
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Append a step to the script of `url`
    pub fn push(&self, url: &str, step: Step) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(step);
    }

    /// Replace the script of `url` with a single repeating step
    pub fn set(&self, url: &str, step: Step) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), VecDeque::from([step]));
    }

    /// Number of fetches made for `url`
    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn next(&self, url: &str) -> Step {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(url) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap(),
            Some(script) => script.front().cloned().unwrap_or(Step::NotFound),
            None => Step::NotFound,
        }
    }
}

#[async_trait]
impl AlertSource for ScriptedSource {
    async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        let step = self.next(url);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match step {
            Step::Found(alert) => Ok(FetchOutcome::Found(alert)),
            Step::NotFound => Ok(FetchOutcome::NotFound),
            Step::Fail => Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
            }),
        }
    }
}

/// A firing alert with the given id and severity
pub fn firing(id: &str, severity: &str) -> Alert {
    let mut alert = Alert {
        id: id.to_string(),
        name: format!("alert-{id}"),
        group_id: "group".to_string(),
        expression: "up == 0".to_string(),
        state: "firing".to_string(),
        value: "0".to_string(),
        ..Default::default()
    };
    alert
        .labels
        .insert("severity".to_string(), severity.to_string());
    alert.annotations.summary = format!("summary {id}");
    alert
}

/// Same alert in another state
#[allow(dead_code)]
pub fn in_state(alert: &Alert, state: &str) -> Alert {
    Alert {
        state: state.to_string(),
        ..alert.clone()
    }
}

/// Manager over `source` with a three hour reminder interval
#[allow(dead_code)]
pub fn manager(source: Arc<ScriptedSource>) -> (Arc<AlertManager>, mpsc::Receiver<String>) {
    manager_with(source, AlertManagerConfig::default())
}

#[allow(dead_code)]
pub fn manager_with(
    source: Arc<ScriptedSource>,
    config: AlertManagerConfig,
) -> (Arc<AlertManager>, mpsc::Receiver<String>) {
    let (notifier, rx) = Notifier::channel(64, Duration::from_millis(50));
    let manager = AlertManager::new(source, MessageRenderer::new().unwrap(), notifier, config);
    (Arc::new(manager), rx)
}

/// Everything queued so far
pub fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}
