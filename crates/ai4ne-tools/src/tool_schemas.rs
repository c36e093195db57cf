// ABOUTME: LLM tool schemas for the inventory, topology and routing operations
// ABOUTME: Names and descriptions are surfaced to the model exactly as written here

use ai4ne_ai::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

pub const FETCH_DEVICES: &str = "fetchDevices";
pub const FETCH_NETWORK_TOPOLOGY: &str = "fetchNetworkTopology";
pub const ROUTE: &str = "route";

/// Tool schema for LLM function calling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue,
}

impl ToolSchema {
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            self.name.clone(),
            self.description.clone(),
            self.parameters.clone(),
        )
    }
}

/// Collection of all routing tool schemas
pub struct RoutingToolSchemas;

impl RoutingToolSchemas {
    /// Get all tool schemas for registration with LLM
    pub fn all() -> Vec<ToolSchema> {
        vec![
            Self::fetch_devices(),
            Self::fetch_network_topology(),
            Self::route(),
        ]
    }

    /// Schemas in the provider-facing function format
    pub fn definitions() -> Vec<ToolDefinition> {
        Self::all().iter().map(ToolSchema::to_definition).collect()
    }

    /// Schema for fetchDevices
    pub fn fetch_devices() -> ToolSchema {
        ToolSchema {
            name: FETCH_DEVICES.to_string(),
            description:
                "Get a list of hardware devices in a network and their technical specifications"
                    .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    /// Schema for fetchNetworkTopology
    pub fn fetch_network_topology() -> ToolSchema {
        ToolSchema {
            name: FETCH_NETWORK_TOPOLOGY.to_string(),
            description: "Fetch the network topology. It returns a JSON representation of the network structure,\n\
                including devices and connections.\n\
                Each node is associated with its unique identifier and corresponds to a network hardware device.\n\
                The starting and ending nodes are marked with the boolean fields \"start\" and \"end\" respectively.\n\
                The connections between nodes represent the network links.\n"
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    /// Schema for route
    pub fn route() -> ToolSchema {
        ToolSchema {
            name: ROUTE.to_string(),
            description: "Calculates a network route based on specified device constraints.\n\
                This function takes a list of device IDs and attempts to find a path through the network\n\
                that includes these devices. It returns a list of possible paths\n\
                that meet the specified constraints.\n"
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "deviceIds": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Identifiers of the devices the route must pass through"
                    }
                },
                "required": ["deviceIds"]
            }),
        }
    }

    /// Get schema by name
    pub fn get_by_name(name: &str) -> Option<ToolSchema> {
        Self::all().into_iter().find(|s| s.name == name)
    }

    /// Get all tool names
    pub fn tool_names() -> Vec<String> {
        Self::all().into_iter().map(|s| s.name).collect()
    }
}
