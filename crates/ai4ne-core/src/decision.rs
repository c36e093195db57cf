use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The user's natural-language routing requirement. Opaque beyond being embedded in a
/// prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionRequest(String);

impl DecisionRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DecisionRequest {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for DecisionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decision protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DecisionMode {
    /// Context embedded in the prompt, single model call
    #[default]
    Direct,
    /// Model fetches what it needs through tool calls
    Agentic,
}

impl fmt::Display for DecisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionMode::Direct => write!(f, "direct"),
            DecisionMode::Agentic => write!(f, "agentic"),
        }
    }
}

impl FromStr for DecisionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "direct" | "simple" | "simple_llm" => Ok(DecisionMode::Direct),
            "agentic" | "function_calling" | "tools" => Ok(DecisionMode::Agentic),
            other => Err(format!(
                "Invalid decision mode: {}. Must be one of: direct, agentic",
                other
            )),
        }
    }
}

/// Which RouteDecision shape the prompt asks the model for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DecisionContract {
    /// Ordered topology node identifiers plus a motivation
    #[default]
    Path,
    /// Comma-separated device identifiers
    Devices,
}

impl fmt::Display for DecisionContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionContract::Path => write!(f, "path"),
            DecisionContract::Devices => write!(f, "devices"),
        }
    }
}

impl FromStr for DecisionContract {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "path" => Ok(DecisionContract::Path),
            "devices" | "device" => Ok(DecisionContract::Devices),
            other => Err(format!(
                "Invalid decision contract: {}. Must be one of: path, devices",
                other
            )),
        }
    }
}

/// Path-returning decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlan {
    /// Ordered identifiers of the topology nodes the request is routed through (node ids, not device ids)
    pub selected_path: Vec<String>,
    /// Why this path was chosen over the alternatives
    pub motivation: String,
}

/// Device-selecting decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSelection {
    pub selected_device_ids: Vec<String>,
}

/// Terminal output of a decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteDecision {
    Path(RoutePlan),
    Devices(DeviceSelection),
}

impl RouteDecision {
    pub fn contract(&self) -> DecisionContract {
        match self {
            RouteDecision::Path(_) => DecisionContract::Path,
            RouteDecision::Devices(_) => DecisionContract::Devices,
        }
    }

    /// Identifiers referenced by the decision, in order
    pub fn identifiers(&self) -> &[String] {
        match self {
            RouteDecision::Path(plan) => &plan.selected_path,
            RouteDecision::Devices(selection) => &selection.selected_device_ids,
        }
    }
}
