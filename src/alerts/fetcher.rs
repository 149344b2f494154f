//! Alert source access
//!
//! Fetches the current state of a single alert by URL. The outcome is one of:
//! found (decoded [`Alert`]), gone (HTTP 404) or a [`FetchError`] for anything
//! transient. No retries happen here; the manager simply asks again next tick.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

use super::Alert;

/// Default per-request timeout
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Errors that can occur while fetching an alert
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection failure or other transport error
    #[error("error getting url {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out
    #[error("timeout getting url {url}")]
    Timeout { url: String },

    /// Unexpected HTTP status (anything but 2xx and 404)
    #[error("error getting url {url}: status {status}")]
    Status { url: String, status: u16 },

    /// Body was not a valid alert document
    #[error("json decode error for {url}: {reason}")]
    Decode { url: String, reason: String },

    /// HTTP client could not be built
    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// URL the error relates to, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Transport { url, .. }
            | Self::Timeout { url }
            | Self::Status { url, .. }
            | Self::Decode { url, .. } => Some(url),
            Self::Client(_) => None,
        }
    }

    /// Check if retrying later could succeed
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Client(_))
    }
}

/// Successful fetch outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The alert exists upstream
    Found(Alert),
    /// The source answered 404: the alert no longer exists
    NotFound,
}

/// Where alert state comes from
///
/// Implemented over HTTP by [`HttpAlertFetcher`]; tests plug in scripted sources.
#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Fetch the current state of the alert at `url`
    async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError>;
}

/// HTTP alert fetcher with a bounded request timeout
#[derive(Debug, Clone)]
pub struct HttpAlertFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpAlertFetcher {
    /// Create a fetcher with the default timeout
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Client` if the HTTP client cannot be created
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    /// Create a fetcher with a custom timeout
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Client` if the HTTP client cannot be created
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("homebot/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    /// Configured request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn classify(url: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

#[async_trait]
impl AlertSource for HttpAlertFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::classify(url, e))?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(FetchOutcome::NotFound);
        }

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| Self::classify(url, e))?;

        let alert: Alert = serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(FetchOutcome::Found(alert))
    }
}
