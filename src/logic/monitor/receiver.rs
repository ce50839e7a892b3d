//! Sensor receiver client
//!
//! HTTP client for the serial-bridge receiver service. Every call is
//! bounded by the client timeout; callers map failures to a
//! disconnected status and retry on the next tick.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("network error: {0}")]
    NetworkError(String),

    #[error("server returned status {0}")]
    ServerError(u16),

    #[error("parse error: {0}")]
    ParseError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    /// Reachable but answered with a non-success status
    Error,
    #[default]
    Disconnected,
}

/// Counters reported by `GET /status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiverStatus {
    #[serde(default)]
    pub data_points_received: u64,
    #[serde(default)]
    pub models_loaded: u64,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(skip)]
    pub state: ConnectionState,
}

impl ReceiverStatus {
    /// Placeholder used when the receiver cannot be reached
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn summary(&self) -> String {
        match self.state {
            ConnectionState::Connected => format!(
                "Receiver connected - data points: {} | models: {} | last update: {}",
                self.data_points_received,
                self.models_loaded,
                self.last_update.as_deref().unwrap_or("unknown")
            ),
            ConnectionState::Error => "Receiver error".to_string(),
            ConnectionState::Disconnected => "Receiver disconnected".to_string(),
        }
    }
}

pub struct ReceiverClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl ReceiverClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ReceiverError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|e| ReceiverError::NetworkError(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ReceiverError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ReceiverError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| ReceiverError::ParseError(e.to_string()))
        } else {
            Err(ReceiverError::ServerError(response.status().as_u16()))
        }
    }

    pub async fn fetch_status(&self) -> Result<ReceiverStatus, ReceiverError> {
        let mut status: ReceiverStatus = self.get_json(&format!("{}/status", self.base_url)).await?;
        status.state = ConnectionState::Connected;
        Ok(status)
    }

    /// Status, or a placeholder describing why it is unavailable
    pub async fn status(&self) -> ReceiverStatus {
        match self.fetch_status().await {
            Ok(status) => status,
            Err(ReceiverError::ServerError(code)) => {
                log::debug!("Receiver status returned {}", code);
                ReceiverStatus {
                    state: ConnectionState::Error,
                    ..Default::default()
                }
            }
            Err(e) => {
                log::debug!("Receiver unreachable: {}", e);
                ReceiverStatus::disconnected()
            }
        }
    }

    /// Up to `limit` most recent records held by the receiver
    pub async fn fetch_data(&self, limit: usize) -> Result<Vec<Value>, ReceiverError> {
        self.get_json(&format!("{}/data?limit={}", self.base_url, limit))
            .await
    }
}
