//! HTTP API tests against the router, without a network listener

mod common;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use common::{drain, firing, ScriptedSource, Step};
use homebot::alerts::{AlertManager, AlertManagerConfig, MessageRenderer};
use homebot::notifications::channels::ChannelResult;
use homebot::notifications::{Channel, ChannelError, DeliveryStatus, Notifier};
use homebot::server::{create_router, AppState};
use tokio::sync::{mpsc, watch};

/// Records direct messages; fails for chat 0
#[derive(Default)]
struct DirectChats {
    sent: Mutex<Vec<(i64, String)>>,
}

#[async_trait]
impl Channel for DirectChats {
    fn name(&self) -> &str {
        "direct"
    }

    async fn send(&self, _message: &str) -> ChannelResult<DeliveryStatus> {
        Ok(DeliveryStatus::success("direct"))
    }

    async fn send_to_chat(&self, chat_id: i64, message: &str) -> ChannelResult<DeliveryStatus> {
        if chat_id == 0 {
            return Err(ChannelError::Unavailable("bot is not connected".to_string()));
        }
        self.sent.lock().unwrap().push((chat_id, message.to_string()));
        Ok(DeliveryStatus::success("direct"))
    }
}

const API_URL: &str = "http://vm:8880/api/v1/alert?group_id=1&alert_id=5";

fn setup(source: Arc<ScriptedSource>) -> (AppState, mpsc::Receiver<String>) {
    let (notifier, rx) = Notifier::channel(16, Duration::from_millis(50));
    let manager = AlertManager::new(
        source,
        MessageRenderer::new().unwrap(),
        notifier.clone(),
        AlertManagerConfig {
            poll_interval: Duration::from_secs(60),
            ..Default::default()
        },
    );
    (AppState::new(Arc::new(manager), notifier), rx)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_text(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (state, _rx) = setup(Arc::new(ScriptedSource::new()));

    let response = create_router(state).oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "healthy");
    assert_eq!(json["data"]["tracked_alerts"], 0);
}

#[tokio::test]
async fn test_list_and_mute() {
    let source = Arc::new(ScriptedSource::new());
    source.set(API_URL, Step::Found(firing("5", "critical")));
    let (state, _rx) = setup(Arc::clone(&source));
    state.manager.register_url(API_URL).await;

    let router = create_router(state.clone());

    let response = router.clone().oneshot(get("/api/alerts")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["url"], API_URL);
    assert!(json[0].get("muted").is_none());

    let response = router
        .clone()
        .oneshot(get("/api/alerts/5/mute"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");

    let response = router
        .clone()
        .oneshot(get("/api/alerts/unknown/mute"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "alert not found");

    let response = router.oneshot(get("/api/alerts")).await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json[0]["muted"], true);
}

#[tokio::test]
async fn test_webhook_registers_rewritten_urls() {
    let source = Arc::new(ScriptedSource::new());
    source.set(API_URL, Step::Found(firing("5", "warning")));
    let (state, mut rx) = setup(Arc::clone(&source));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tasks = state.manager.start(shutdown_rx);

    let payload = serde_json::json!([
        {
            "startsAt": "2024-05-01T10:00:00Z",
            "endsAt": "0001-01-01T00:00:00Z",
            "generatorURL": "http://vm:8880/vmalert/alert?group_id=1&alert_id=5",
            "labels": {"alertname": "DiskFull"},
            "annotations": {"summary": "disk"}
        },
        {
            "generatorURL": "not a url"
        }
    ]);

    let response = create_router(state.clone())
        .oneshot(post_json("/api/v2/alerts", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");

    let notice = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(notice.contains("id:5"));
    assert_eq!(state.manager.len(), 1);
    assert_eq!(source.calls("not a url"), 0);

    shutdown_tx.send(true).unwrap();
    tasks.await.unwrap();
}

#[tokio::test]
async fn test_grafana_relay() {
    let (state, mut rx) = setup(Arc::new(ScriptedSource::new()));

    let payload = serde_json::json!({
        "title": "[Alerting] CPU",
        "message": "load > 4",
        "ruleUrl": "http://grafana/d/1",
        "ruleName": "CPU",
        "state": "alerting",
        "orgId": 1
    });

    let response = create_router(state)
        .oneshot(post_json("/grafana", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let messages = drain(&mut rx);
    assert_eq!(messages, vec!["❗ [Alerting] CPU\n\nload &gt; 4\nhttp://grafana/d/1"]);
}

#[tokio::test]
async fn test_webhook_rejects_malformed_body() {
    let (state, _rx) = setup(Arc::new(ScriptedSource::new()));

    let response = create_router(state)
        .oneshot(post_json("/api/v2/alerts", serde_json::json!({"not": "a list"})))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_send_to_known_user() {
    let chats = Arc::new(DirectChats::default());
    let (state, mut rx) = setup(Arc::new(ScriptedSource::new()));
    let state = state.with_direct(
        chats.clone(),
        HashMap::from([("alice".to_string(), 42), ("ghost".to_string(), 0)]),
    );
    let router = create_router(state);

    let response = router
        .clone()
        .oneshot(post_text("/send/alice", "disk <90%> full"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
    assert_eq!(
        *chats.sent.lock().unwrap(),
        vec![(42, "disk &lt;90%&gt; full".to_string())]
    );

    let response = router
        .oneshot(post_text("/send/ghost", "hello"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(response).await.contains("bot is not connected"));

    // Direct messages bypass the subscriber queue
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_send_to_unknown_user() {
    let chats = Arc::new(DirectChats::default());
    let (state, _rx) = setup(Arc::new(ScriptedSource::new()));
    let state = state.with_direct(chats.clone(), HashMap::from([("alice".to_string(), 42)]));

    let response = create_router(state)
        .oneshot(post_text("/send/bob", "hello"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(chats.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_send_empty_body() {
    let chats = Arc::new(DirectChats::default());
    let (state, _rx) = setup(Arc::new(ScriptedSource::new()));
    let state = state.with_direct(chats.clone(), HashMap::from([("alice".to_string(), 42)]));

    let response = create_router(state)
        .oneshot(post_text("/send/alice", ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "empty body");
    assert!(chats.sent.lock().unwrap().is_empty());
}
