// ABOUTME: Tool bridge between the model and the inventory service
// ABOUTME: Declares fetchDevices, fetchNetworkTopology and route and executes the calls

pub mod tool_executor;
pub mod tool_schemas;

pub use tool_executor::{ToolBridge, ToolError, ToolOutcome, ToolRecord, ToolSession};
pub use tool_schemas::{RoutingToolSchemas, ToolSchema};
