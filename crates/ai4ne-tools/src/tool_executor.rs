// ABOUTME: Executes model tool calls against the inventory service
// ABOUTME: Failures become textual error payloads; successful bodies pass through verbatim

use ai4ne_ai::ToolCall;
use ai4ne_core::{
    DecisionError, DeviceSnapshot, InventoryError, InventoryService, TopologyGraph,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::tool_schemas::{FETCH_DEVICES, FETCH_NETWORK_TOPOLOGY, ROUTE};

const TOOL_LOG_TARGET: &str = "ai4ne::tools";

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

/// One executed tool call, kept for the decision report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRecord {
    pub name: String,
    pub arguments: JsonValue,
    pub success: bool,
    pub result_bytes: usize,
    pub duration_ms: u64,
}

/// Text handed back to the model for one call
#[derive(Debug)]
pub struct ToolOutcome {
    pub content: String,
    /// Set when `content` is an error payload
    pub error: Option<DecisionError>,
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Deserialize)]
struct RouteArguments {
    #[serde(rename = "deviceIds", alias = "device_ids")]
    device_ids: Vec<String>,
}

/// Shared entry point to the tool operations. Holds no per-request state.
#[derive(Clone)]
pub struct ToolBridge {
    inventory: Arc<dyn InventoryService>,
}

impl ToolBridge {
    pub fn new(inventory: Arc<dyn InventoryService>) -> Self {
        Self { inventory }
    }

    /// Start a session scoped to one orchestrator invocation
    pub fn session(&self) -> ToolSession {
        ToolSession {
            inventory: self.inventory.clone(),
            devices: None,
            topology: None,
            records: Vec::new(),
        }
    }
}

/// Tool execution state for a single decision: the snapshots handed to the model and
/// a record of every call.
pub struct ToolSession {
    inventory: Arc<dyn InventoryService>,
    devices: Option<DeviceSnapshot>,
    topology: Option<TopologyGraph>,
    records: Vec<ToolRecord>,
}

impl ToolSession {
    /// Execute one model-requested call. Never fails; errors are returned as
    /// `{"error": ..., "tool": ...}` text for the model to read.
    pub async fn execute(&mut self, call: &ToolCall) -> ToolOutcome {
        let tool_name = call.function.name.as_str();
        let start = Instant::now();

        info!(target: TOOL_LOG_TARGET, tool = tool_name, "Tool call started");
        debug!(
            target: TOOL_LOG_TARGET,
            tool = tool_name,
            "Tool input payload: {}",
            call.function.arguments
        );

        let result = self.dispatch(tool_name, &call.function.arguments).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(body) => {
                info!(
                    target: TOOL_LOG_TARGET,
                    tool = tool_name,
                    duration_ms,
                    bytes = body.len(),
                    "Tool call completed"
                );
                ToolOutcome {
                    content: body,
                    error: None,
                }
            }
            Err(e) => {
                warn!(
                    target: TOOL_LOG_TARGET,
                    tool = tool_name,
                    duration_ms,
                    error = %e,
                    "Tool call failed"
                );
                ToolOutcome {
                    content: error_payload(tool_name, &e),
                    error: Some(DecisionError::ToolExecution {
                        tool: tool_name.to_string(),
                        message: e.to_string(),
                    }),
                }
            }
        };

        self.records.push(ToolRecord {
            name: tool_name.to_string(),
            arguments: serde_json::from_str(&call.function.arguments)
                .unwrap_or_else(|_| JsonValue::String(call.function.arguments.clone())),
            success: outcome.is_success(),
            result_bytes: outcome.content.len(),
            duration_ms,
        });

        outcome
    }

    async fn dispatch(&mut self, tool_name: &str, arguments: &str) -> Result<String, ToolError> {
        match tool_name {
            FETCH_DEVICES => {
                let body = self.inventory.fetch_devices().await?;
                self.devices = Some(DeviceSnapshot::new(body.as_str()));
                Ok(body)
            }
            FETCH_NETWORK_TOPOLOGY => {
                let body = self.inventory.fetch_topology().await?;
                self.topology = match TopologyGraph::parse(body.as_str()) {
                    Ok(graph) => Some(graph),
                    Err(e) => {
                        warn!(target: TOOL_LOG_TARGET, error = %e, "Topology handed to the model is not parseable");
                        None
                    }
                };
                Ok(body)
            }
            ROUTE => {
                let args = parse_route_arguments(arguments)?;
                Ok(self.inventory.compute_route(&args.device_ids).await?)
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// Last device list the model received in this session
    pub fn observed_devices(&self) -> Option<&DeviceSnapshot> {
        self.devices.as_ref()
    }

    /// Last topology the model received in this session
    pub fn observed_topology(&self) -> Option<&TopologyGraph> {
        self.topology.as_ref()
    }

    pub fn records(&self) -> &[ToolRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ToolRecord> {
        self.records
    }
}

fn parse_route_arguments(arguments: &str) -> Result<RouteArguments, ToolError> {
    if arguments.trim().is_empty() {
        return Err(ToolError::InvalidArguments(
            "missing required parameter deviceIds".to_string(),
        ));
    }
    serde_json::from_str(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

fn error_payload(tool_name: &str, error: &ToolError) -> String {
    json!({
        "error": error.to_string(),
        "tool": tool_name,
    })
    .to_string()
}
