// ABOUTME: Context Fetcher - pulls fresh device and topology snapshots per request
// ABOUTME: Any fetch failure is ContextUnavailable; no stale or empty substitutes

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{DecisionError, Result};
use crate::inventory::{InventoryError, InventoryOperation, InventoryService};
use crate::snapshot::{DeviceSnapshot, TopologyGraph};

/// Both snapshots a Direct Mode prompt is rendered against
#[derive(Debug, Clone)]
pub struct ContextSnapshots {
    pub devices: DeviceSnapshot,
    pub topology: TopologyGraph,
}

pub struct ContextFetcher {
    inventory: Arc<dyn InventoryService>,
}

impl ContextFetcher {
    pub fn new(inventory: Arc<dyn InventoryService>) -> Self {
        Self { inventory }
    }

    /// The device body is kept as delivered; its schema is not checked here
    pub async fn fetch_devices(&self) -> std::result::Result<DeviceSnapshot, InventoryError> {
        let raw = self.inventory.fetch_devices().await?;
        Ok(DeviceSnapshot::new(raw))
    }

    pub async fn fetch_topology(&self) -> std::result::Result<TopologyGraph, InventoryError> {
        let raw = self.inventory.fetch_topology().await?;
        TopologyGraph::parse(raw).map_err(|e| InventoryError::Payload {
            operation: InventoryOperation::FetchTopology,
            message: e.to_string(),
        })
    }

    /// Fetch devices, then topology. The first failure ends the request.
    pub async fn fetch_all(&self) -> Result<ContextSnapshots> {
        let devices = self.fetch_devices().await.map_err(|e| {
            warn!(error = %e, "Device inventory unavailable");
            DecisionError::ContextUnavailable(e)
        })?;
        info!(bytes = devices.raw().len(), "Fetched device inventory");

        let topology = self.fetch_topology().await.map_err(|e| {
            warn!(error = %e, "Network topology unavailable");
            DecisionError::ContextUnavailable(e)
        })?;
        info!(
            nodes = topology.nodes().len(),
            edges = topology.edges().len(),
            "Fetched network topology"
        );

        Ok(ContextSnapshots { devices, topology })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticInventory {
        devices: std::result::Result<String, u16>,
        topology: std::result::Result<String, u16>,
        topology_calls: AtomicUsize,
    }

    #[async_trait]
    impl InventoryService for StaticInventory {
        async fn fetch_devices(&self) -> std::result::Result<String, InventoryError> {
            self.devices.clone().map_err(|status| InventoryError::Status {
                operation: InventoryOperation::FetchDevices,
                status,
                body: "internal error".to_string(),
            })
        }

        async fn fetch_topology(&self) -> std::result::Result<String, InventoryError> {
            self.topology_calls.fetch_add(1, Ordering::SeqCst);
            self.topology.clone().map_err(|status| InventoryError::Status {
                operation: InventoryOperation::FetchTopology,
                status,
                body: "internal error".to_string(),
            })
        }

        async fn compute_route(
            &self,
            _device_ids: &[String],
        ) -> std::result::Result<String, InventoryError> {
            Ok("[]".to_string())
        }
    }

    fn inventory(
        devices: std::result::Result<&str, u16>,
        topology: std::result::Result<&str, u16>,
    ) -> Arc<StaticInventory> {
        Arc::new(StaticInventory {
            devices: devices.map(str::to_string),
            topology: topology.map(str::to_string),
            topology_calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_fetch_all_returns_both_snapshots() {
        let fetcher = ContextFetcher::new(inventory(
            Ok(r#"[{"id": "d1"}]"#),
            Ok(r#"{"nodes": [{"id": "N1", "start": true}, {"id": "N2", "end": true}], "edges": []}"#),
        ));

        let context = fetcher.fetch_all().await.expect("context");
        assert!(context.devices.ids().unwrap().contains("d1"));
        assert!(context.topology.contains_node("N2"));
    }

    #[tokio::test]
    async fn test_device_failure_skips_topology() {
        let service = inventory(Err(500), Ok(r#"{"nodes": []}"#));
        let fetcher = ContextFetcher::new(service.clone());

        let err = fetcher.fetch_all().await.unwrap_err();
        assert!(matches!(err, DecisionError::ContextUnavailable(_)));
        assert_eq!(service.topology_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_undecodable_topology_is_context_unavailable() {
        let fetcher = ContextFetcher::new(inventory(Ok("[]"), Ok("not json")));

        match fetcher.fetch_all().await {
            Err(DecisionError::ContextUnavailable(inner)) => {
                assert_eq!(inner.operation(), Some(InventoryOperation::FetchTopology));
            }
            other => panic!("expected ContextUnavailable, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_topology_failure_is_context_unavailable() {
        let service = inventory(Ok(r#"[{"id": "d1"}]"#), Err(500));
        let fetcher = ContextFetcher::new(service.clone());

        match fetcher.fetch_all().await {
            Err(DecisionError::ContextUnavailable(InventoryError::Status {
                operation,
                status,
                ..
            })) => {
                assert_eq!(operation, InventoryOperation::FetchTopology);
                assert_eq!(status, 500);
            }
            other => panic!("expected ContextUnavailable, got {:?}", other.map(|_| ())),
        }
        assert_eq!(service.topology_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_device_body_without_ids_is_still_context() {
        let body = r#"[{"name": "d1", "latency_ms": 2}]"#;
        let fetcher = ContextFetcher::new(inventory(
            Ok(body),
            Ok(r#"{"nodes": [{"id": "N1"}], "edges": []}"#),
        ));

        let context = fetcher.fetch_all().await.expect("context");
        assert_eq!(context.devices.raw(), body);
    }
}
