//! HTTP server lifecycle

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::alerts::AlertManager;
use crate::config::HttpConfig;
use crate::notifications::{Channel, LogChannel, Notifier};

use super::api::create_router;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Alert manager
    pub manager: Arc<AlertManager>,

    /// Outgoing notification queue
    pub notifier: Notifier,

    /// Channel for messages addressed to one user
    pub direct: Arc<dyn Channel>,

    /// Known users by name
    pub users: Arc<HashMap<String, i64>>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// State without known users; direct messages go to the log
    pub fn new(manager: Arc<AlertManager>, notifier: Notifier) -> Self {
        Self {
            manager,
            notifier,
            direct: Arc::new(LogChannel::new()),
            users: Arc::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Deliver direct messages through `channel` to the given users
    pub fn with_direct(mut self, channel: Arc<dyn Channel>, users: HashMap<String, i64>) -> Self {
        self.direct = channel;
        self.users = Arc::new(users);
        self
    }
}

/// HTTP server for webhooks and alert inspection
pub struct HttpServer {
    config: HttpConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new server
    pub fn new(config: HttpConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Configured bind address
    pub fn bind_address(&self) -> SocketAddr {
        self.config.bind_address
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Serve until `shutdown_signal` resolves
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        tracing::info!("Starting HTTP server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(ServerError::Serve)?;

        tracing::info!("HTTP server shutdown complete");
        Ok(())
    }
}

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to bind to address
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Server error
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}
