pub mod config_manager;
pub mod context_fetcher;
pub mod decision;
pub mod error;
pub mod inventory;
pub mod snapshot;

pub use config_manager::{
    Ai4neConfig, ConfigError, ConfigManager, DecisionConfig, InventoryConfig, LLMConfig,
    LoggingConfig,
};
pub use context_fetcher::{ContextFetcher, ContextSnapshots};
pub use decision::*;
pub use error::{DecisionError, ReferenceKind, Result};
pub use inventory::{HttpInventoryClient, InventoryError, InventoryOperation, InventoryService};
pub use snapshot::{
    DeviceRecord, DeviceSnapshot, SnapshotError, TopologyEdge, TopologyGraph, TopologyNode,
};
