//! REST API handlers
//!
//! This module defines the routes and handlers of the HTTP server.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::alerts::AlertRecordView;

use super::http::AppState;

/// Path segment of the vmalert UI link in webhook payloads
const UI_ALERT_PATH: &str = "/vmalert/alert?";

/// Path segment of the matching JSON API endpoint
const API_ALERT_PATH: &str = "/api/v1/alert?";

// ============================================================================
// API Request / Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub tracked_alerts: usize,
}

/// Annotations of a webhook alert
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebhookAnnotations {
    pub summary: String,
}

/// One entry of an Alertmanager-style webhook payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAlert {
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(rename = "generatorURL")]
    pub generator_url: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: WebhookAnnotations,
}

impl WebhookAlert {
    /// JSON API URL of the alert, if the generator URL is usable
    pub fn api_url(&self) -> Option<String> {
        let rewritten = self.generator_url.replace(UI_ALERT_PATH, API_ALERT_PATH);

        match url::Url::parse(&rewritten) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                tracing::warn!(url = %self.generator_url, error = %e, "invalid alert url");
                None
            }
        }
    }
}

/// Legacy Grafana webhook payload
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GrafanaRequest {
    pub title: String,
    pub message: String,
    pub rule_name: String,
    pub rule_url: String,
    pub state: String,
}

impl GrafanaRequest {
    /// Chat message for this payload
    pub fn to_message(&self) -> String {
        let icon = match self.state.as_str() {
            "ok" => "✅",
            "no_data" => "❕",
            _ => "❗",
        };

        format!(
            "{icon} {}\n\n{}\n{}",
            handlebars::html_escape(&self.title),
            handlebars::html_escape(&self.message),
            handlebars::html_escape(&self.rule_url),
        )
    }
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/v2/alerts", post(receive_alerts))
        .route("/api/alerts", get(list_alerts))
        .route("/api/alerts/{id}/mute", get(mute_alert))
        .route("/grafana", post(grafana))
        .route("/send/{name}", post(send_to_user))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        tracked_alerts: state.manager.len(),
    }))
}

/// Register every alert URL of a webhook payload
async fn receive_alerts(
    State(state): State<AppState>,
    Json(alerts): Json<Vec<WebhookAlert>>,
) -> impl IntoResponse {
    tracing::debug!(count = alerts.len(), "alert webhook received");

    for url in alerts.iter().filter_map(WebhookAlert::api_url) {
        state.manager.submit(url);
    }

    "ok"
}

/// List tracked alerts
async fn list_alerts(State(state): State<AppState>) -> Json<Vec<AlertRecordView>> {
    Json(state.manager.snapshot())
}

/// Mute a tracked alert by id
async fn mute_alert(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    if state.manager.mute_by_id(&id) {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::NOT_FOUND, "alert not found")
    }
}

/// Relay a legacy Grafana notification
async fn grafana(
    State(state): State<AppState>,
    Json(request): Json<GrafanaRequest>,
) -> impl IntoResponse {
    tracing::info!(rule = %request.rule_name, state = %request.state, "grafana notification");
    state.notifier.notify(request.to_message()).await;
    "ok"
}

/// Send a plain text body to one user, HTML-escaped
async fn send_to_user(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: String,
) -> (StatusCode, String) {
    let Some(&chat_id) = state.users.get(&name) else {
        tracing::warn!(user = %name, "user not found");
        return (StatusCode::NOT_FOUND, "user not found".to_string());
    };

    if body.is_empty() {
        return (StatusCode::OK, "empty body".to_string());
    }

    match state
        .direct
        .send_to_chat(chat_id, &handlebars::html_escape(&body))
        .await
    {
        Ok(_) => (StatusCode::OK, "ok".to_string()),
        Err(e) => {
            tracing::error!(user = %name, error = %e, "can't send message");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
