// ABOUTME: Device and topology snapshots fetched from the inventory service
// ABOUTME: Keeps the raw body for prompt embedding plus a parsed view for identifier checks

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("device list not understood: {0}")]
    Devices(#[source] serde_json::Error),

    #[error("network topology not understood: {0}")]
    Topology(#[source] serde_json::Error),
}

/// Identifiers arrive as strings or integers depending on the backend
#[derive(Deserialize)]
#[serde(untagged)]
enum Identifier {
    Text(String),
    Number(serde_json::Number),
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        match id {
            Identifier::Text(text) => text,
            Identifier::Number(number) => number.to_string(),
        }
    }
}

fn identifier<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Identifier::deserialize(deserializer).map(String::from)
}

/// One network hardware unit. Only the identifier is interpreted; every other
/// attribute (performance, energy, latency, compliance) is kept as delivered.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeviceRecord {
    #[serde(alias = "device_id", deserialize_with = "identifier")]
    pub id: String,
    #[serde(flatten)]
    pub attributes: Map<String, JsonValue>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DeviceListRepr {
    List(Vec<DeviceRecord>),
    Wrapped { devices: Vec<DeviceRecord> },
}

/// Immutable device inventory snapshot for one request.
///
/// The body is opaque text for prompting. It is only parsed into records when a
/// device selection has to be checked against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSnapshot {
    raw: String,
}

impl DeviceSnapshot {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Body exactly as returned by the inventory service
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parse the body as a device list, plain or wrapped in `{"devices": [..]}`
    pub fn records(&self) -> Result<Vec<DeviceRecord>, SnapshotError> {
        match serde_json::from_str::<DeviceListRepr>(&self.raw).map_err(SnapshotError::Devices)? {
            DeviceListRepr::List(devices) => Ok(devices),
            DeviceListRepr::Wrapped { devices } => Ok(devices),
        }
    }

    pub fn ids(&self) -> Result<BTreeSet<String>, SnapshotError> {
        Ok(self.records()?.into_iter().map(|d| d.id).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopologyNode {
    #[serde(deserialize_with = "identifier")]
    pub id: String,
    #[serde(default)]
    pub start: bool,
    #[serde(default)]
    pub end: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyEdge {
    pub source: String,
    pub target: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EdgeRepr {
    Pair(Identifier, Identifier),
    Named {
        #[serde(alias = "from")]
        source: Identifier,
        #[serde(alias = "to")]
        target: Identifier,
    },
}

impl From<EdgeRepr> for TopologyEdge {
    fn from(edge: EdgeRepr) -> Self {
        let (source, target) = match edge {
            EdgeRepr::Pair(source, target) => (source, target),
            EdgeRepr::Named { source, target } => (source, target),
        };
        TopologyEdge {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Deserialize)]
struct TopologyRepr {
    nodes: Vec<TopologyNode>,
    #[serde(default, alias = "links")]
    edges: Vec<EdgeRepr>,
}

/// Immutable network topology snapshot for one request
#[derive(Debug, Clone)]
pub struct TopologyGraph {
    raw: String,
    nodes: Vec<TopologyNode>,
    edges: Vec<TopologyEdge>,
}

impl TopologyGraph {
    pub fn parse(raw: impl Into<String>) -> Result<Self, SnapshotError> {
        let raw = raw.into();
        let repr: TopologyRepr = serde_json::from_str(&raw).map_err(SnapshotError::Topology)?;
        Ok(Self {
            raw,
            nodes: repr.nodes,
            edges: repr.edges.into_iter().map(TopologyEdge::from).collect(),
        })
    }

    /// Body exactly as returned by the inventory service
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn nodes(&self) -> &[TopologyNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[TopologyEdge] {
        &self.edges
    }

    pub fn node_ids(&self) -> BTreeSet<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == node_id)
    }

    pub fn start_nodes(&self) -> impl Iterator<Item = &TopologyNode> {
        self.nodes.iter().filter(|n| n.start)
    }

    pub fn end_nodes(&self) -> impl Iterator<Item = &TopologyNode> {
        self.nodes.iter().filter(|n| n.end)
    }
}
