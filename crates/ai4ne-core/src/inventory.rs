// ABOUTME: Client for the external inventory/topology/routing service
// ABOUTME: Raw-body access to /devices, /network_topology and /route behind a swappable trait

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use crate::config_manager::InventoryConfig;

/// The three remote operations offered by the inventory service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryOperation {
    FetchDevices,
    FetchTopology,
    ComputeRoute,
}

impl InventoryOperation {
    pub fn path(&self) -> &'static str {
        match self {
            InventoryOperation::FetchDevices => "/devices",
            InventoryOperation::FetchTopology => "/network_topology",
            InventoryOperation::ComputeRoute => "/route",
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            InventoryOperation::ComputeRoute => "POST",
            _ => "GET",
        }
    }
}

impl fmt::Display for InventoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Failed to create inventory HTTP client: {0}")]
    Setup(String),

    #[error("{operation} failed: {message}")]
    Transport {
        operation: InventoryOperation,
        message: String,
    },

    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: InventoryOperation,
        status: u16,
        body: String,
    },

    #[error("{operation} returned an unreadable payload: {message}")]
    Payload {
        operation: InventoryOperation,
        message: String,
    },

    #[error("{operation} was never fetched for this request")]
    NotFetched { operation: InventoryOperation },
}

impl InventoryError {
    pub fn operation(&self) -> Option<InventoryOperation> {
        match self {
            InventoryError::Setup(_) => None,
            InventoryError::Transport { operation, .. }
            | InventoryError::Status { operation, .. }
            | InventoryError::Payload { operation, .. }
            | InventoryError::NotFetched { operation } => Some(*operation),
        }
    }
}

/// Remote inventory/topology/routing service.
///
/// Every method returns the response body untouched; interpretation belongs to the
/// caller. Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// GET /devices
    async fn fetch_devices(&self) -> Result<String, InventoryError>;

    /// GET /network_topology
    async fn fetch_topology(&self) -> Result<String, InventoryError>;

    /// POST /route with `{"device_ids": [...]}`
    async fn compute_route(&self, device_ids: &[String]) -> Result<String, InventoryError>;
}

#[derive(Debug, Serialize)]
struct DeviceConstraints<'a> {
    device_ids: &'a [String],
}

/// reqwest-backed inventory client. The inner client pools connections and can be
/// cloned cheaply.
#[derive(Clone)]
pub struct HttpInventoryClient {
    base_url: String,
    client: Client,
}

impl HttpInventoryClient {
    pub fn new(config: &InventoryConfig) -> Result<Self, InventoryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InventoryError::Setup(e.to_string()))?;

        Ok(Self::with_client(config.base_url.clone(), client))
    }

    /// Reuse an existing (shared) HTTP client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, operation: InventoryOperation) -> String {
        format!("{}{}", self.base_url, operation.path())
    }

    async fn read_body(
        operation: InventoryOperation,
        response: reqwest::Response,
    ) -> Result<String, InventoryError> {
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(InventoryError::Status {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        response.text().await.map_err(|e| InventoryError::Payload {
            operation,
            message: e.to_string(),
        })
    }

    async fn get(&self, operation: InventoryOperation) -> Result<String, InventoryError> {
        let start = Instant::now();
        let response = self
            .client
            .get(self.url(operation))
            .send()
            .await
            .map_err(|e| InventoryError::Transport {
                operation,
                message: e.to_string(),
            })?;

        let body = Self::read_body(operation, response).await?;
        debug!(
            operation = %operation,
            duration_ms = start.elapsed().as_millis() as u64,
            bytes = body.len(),
            "Inventory call completed"
        );
        Ok(body)
    }
}

#[async_trait]
impl InventoryService for HttpInventoryClient {
    async fn fetch_devices(&self) -> Result<String, InventoryError> {
        self.get(InventoryOperation::FetchDevices).await
    }

    async fn fetch_topology(&self) -> Result<String, InventoryError> {
        self.get(InventoryOperation::FetchTopology).await
    }

    async fn compute_route(&self, device_ids: &[String]) -> Result<String, InventoryError> {
        let operation = InventoryOperation::ComputeRoute;
        let start = Instant::now();
        let response = self
            .client
            .post(self.url(operation))
            .json(&DeviceConstraints { device_ids })
            .send()
            .await
            .map_err(|e| InventoryError::Transport {
                operation,
                message: e.to_string(),
            })?;

        let body = Self::read_body(operation, response).await?;
        debug!(
            operation = %operation,
            constraints = device_ids.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            bytes = body.len(),
            "Inventory call completed"
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_display() {
        assert_eq!(InventoryOperation::FetchDevices.to_string(), "GET /devices");
        assert_eq!(
            InventoryOperation::FetchTopology.to_string(),
            "GET /network_topology"
        );
        assert_eq!(InventoryOperation::ComputeRoute.to_string(), "POST /route");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = HttpInventoryClient::with_client("http://inventory:8000/", Client::new());
        assert_eq!(client.base_url(), "http://inventory:8000");
        assert_eq!(
            client.url(InventoryOperation::ComputeRoute),
            "http://inventory:8000/route"
        );
    }

    #[test]
    fn test_route_body_uses_snake_case_key() {
        let ids = vec!["d1".to_string(), "d2".to_string()];
        let body = serde_json::to_string(&DeviceConstraints { device_ids: &ids }).unwrap();
        assert_eq!(body, r#"{"device_ids":["d1","d2"]}"#);
    }
}
