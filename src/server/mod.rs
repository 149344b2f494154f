//! HTTP surface of the bot
//!
//! Receives alert webhooks and exposes the tracked alerts.
//!
//! # Routes
//!
//! ```text
//! POST /api/v2/alerts          Alertmanager-style webhook, registers alert URLs
//! GET  /api/alerts             tracked alerts as JSON
//! GET  /api/alerts/{id}/mute   mute by alert id
//! POST /grafana                legacy Grafana webhook, relayed to the notifier
//! POST /send/{name}            plain text body sent to one known user
//! GET  /api/health             liveness and tracked alert count
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use homebot::server::{AppState, HttpServer};
//!
//! let server = HttpServer::new(config.http.clone(), AppState::new(manager, notifier));
//! server.start_with_shutdown(shutdown_signal).await?;
//! ```

pub mod api;
pub mod http;

pub use api::create_router;
pub use http::{AppState, HttpServer, ServerError};
