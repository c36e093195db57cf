use ai4ne_ai::ToolCall;
use ai4ne_core::{InventoryError, InventoryOperation, InventoryService};
use ai4ne_tools::{RoutingToolSchemas, ToolBridge};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

const DEVICES: &str = r#"[{"id":"d1","latency_ms":2},{"id":"d2","latency_ms":5}]"#;
const TOPOLOGY: &str = r#"{"nodes":[{"id":"N1","start":true},{"id":"N2","end":true}],"edges":[{"source":"N1","target":"N2"}]}"#;
const CANDIDATES: &str = r#"[["N1", "N2"], ["N1", "N3", "N2"]]"#;

/// Records every call it receives in order
#[derive(Default)]
struct RecordingInventory {
    calls: Mutex<Vec<String>>,
    fail_route: bool,
}

#[async_trait]
impl InventoryService for RecordingInventory {
    async fn fetch_devices(&self) -> Result<String, InventoryError> {
        self.calls.lock().unwrap().push("devices".to_string());
        Ok(DEVICES.to_string())
    }

    async fn fetch_topology(&self) -> Result<String, InventoryError> {
        self.calls.lock().unwrap().push("topology".to_string());
        Ok(TOPOLOGY.to_string())
    }

    async fn compute_route(&self, device_ids: &[String]) -> Result<String, InventoryError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("route:{}", device_ids.join(",")));
        if self.fail_route {
            return Err(InventoryError::Status {
                operation: InventoryOperation::ComputeRoute,
                status: 503,
                body: "routing engine down".to_string(),
            });
        }
        Ok(CANDIDATES.to_string())
    }
}

fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall::function(id, name, arguments)
}

#[tokio::test]
async fn test_route_result_is_returned_verbatim() {
    let inventory = Arc::new(RecordingInventory::default());
    let bridge = ToolBridge::new(inventory.clone());
    let mut session = bridge.session();

    let outcome = session
        .execute(&call("c1", "route", r#"{"deviceIds":["d1","d2"]}"#))
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.content, CANDIDATES);
    assert_eq!(*inventory.calls.lock().unwrap(), vec!["route:d1,d2"]);

    let record = &session.records()[0];
    assert_eq!(record.name, "route");
    assert_eq!(record.arguments["deviceIds"][1], "d2");
    assert_eq!(record.result_bytes, CANDIDATES.len());
}

#[tokio::test]
async fn test_session_tracks_observed_snapshots() {
    let bridge = ToolBridge::new(Arc::new(RecordingInventory::default()));
    let mut session = bridge.session();
    assert!(session.observed_devices().is_none());

    let devices = session.execute(&call("c1", "fetchDevices", "{}")).await;
    let topology = session
        .execute(&call("c2", "fetchNetworkTopology", ""))
        .await;

    assert_eq!(devices.content, DEVICES);
    assert_eq!(topology.content, TOPOLOGY);
    assert_eq!(session.observed_devices().unwrap().raw(), DEVICES);
    assert!(session.observed_devices().unwrap().ids().unwrap().contains("d2"));
    assert!(session.observed_topology().unwrap().contains_node("N2"));

    // A fresh session starts empty
    assert!(bridge.session().observed_topology().is_none());
}

#[tokio::test]
async fn test_failures_become_error_payloads() {
    let inventory = Arc::new(RecordingInventory {
        fail_route: true,
        ..Default::default()
    });
    let bridge = ToolBridge::new(inventory.clone());
    let mut session = bridge.session();

    let failed = session.execute(&call("c1", "route", r#"{"device_ids":["d9"]}"#)).await;
    let unknown = session.execute(&call("c2", "fetchTopology", "{}")).await;
    let malformed = session.execute(&call("c3", "route", "{\"deviceIds\": ")).await;

    for outcome in [&failed, &unknown, &malformed] {
        assert!(!outcome.is_success());
        let payload: Value = serde_json::from_str(&outcome.content).unwrap();
        assert!(payload["error"].is_string());
        assert_eq!(
            outcome.error.as_ref().map(|e| e.kind()),
            Some("tool_execution_error")
        );
    }

    let payload: Value = serde_json::from_str(&failed.content).unwrap();
    assert_eq!(payload["tool"], "route");
    assert!(payload["error"].as_str().unwrap().contains("503"));

    let payload: Value = serde_json::from_str(&unknown.content).unwrap();
    assert_eq!(payload["tool"], "fetchTopology");

    // Only the well-formed route call reached the service
    assert_eq!(*inventory.calls.lock().unwrap(), vec!["route:d9"]);
    assert_eq!(session.records().iter().filter(|r| !r.success).count(), 3);
}

#[test]
fn test_definitions_match_schemas() {
    let definitions = RoutingToolSchemas::definitions();
    let names: Vec<&str> = definitions
        .iter()
        .map(|d| d.function.name.as_str())
        .collect();
    assert_eq!(names, vec!["fetchDevices", "fetchNetworkTopology", "route"]);
    assert_eq!(
        definitions[0].function.description,
        "Get a list of hardware devices in a network and their technical specifications"
    );
}
