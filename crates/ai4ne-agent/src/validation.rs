use ai4ne_core::{
    DecisionError, DeviceSnapshot, InventoryError, InventoryOperation, ReferenceKind, Result,
    RouteDecision, TopologyGraph,
};
use tracing::warn;

/// Checks that every identifier in a decision exists in the snapshot the model
/// was shown for the same request.
pub struct ReferenceValidator;

impl ReferenceValidator {
    pub fn validate_path(path: &[String], topology: &TopologyGraph) -> Result<()> {
        Self::check(path, ReferenceKind::Node, |id| topology.contains_node(id))
    }

    /// The device body is parsed here, so an unreadable list is `ContextUnavailable`
    pub fn validate_devices(device_ids: &[String], devices: &DeviceSnapshot) -> Result<()> {
        let known = devices.ids().map_err(|e| {
            warn!(error = %e, "Device list cannot be used to check the selection");
            DecisionError::ContextUnavailable(InventoryError::Payload {
                operation: InventoryOperation::FetchDevices,
                message: e.to_string(),
            })
        })?;
        Self::check(device_ids, ReferenceKind::Device, |id| known.contains(id))
    }

    /// Validate whichever identifiers the decision carries. The snapshot matching
    /// the decision's contract must be supplied.
    pub fn validate(
        decision: &RouteDecision,
        devices: Option<&DeviceSnapshot>,
        topology: Option<&TopologyGraph>,
    ) -> Result<()> {
        match decision {
            RouteDecision::Path(plan) => match topology {
                Some(topology) => Self::validate_path(&plan.selected_path, topology),
                None => Err(missing_snapshot(ReferenceKind::Node)),
            },
            RouteDecision::Devices(selection) => match devices {
                Some(devices) => Self::validate_devices(&selection.selected_device_ids, devices),
                None => Err(missing_snapshot(ReferenceKind::Device)),
            },
        }
    }

    fn check(ids: &[String], kind: ReferenceKind, known: impl Fn(&str) -> bool) -> Result<()> {
        let mut unknown: Vec<String> = Vec::new();
        for id in ids {
            if !known(id) && !unknown.contains(id) {
                unknown.push(id.clone());
            }
        }

        if unknown.is_empty() {
            return Ok(());
        }

        warn!(kind = %kind, ids = ?unknown, "Decision references identifiers outside the snapshot");
        Err(DecisionError::UntrustedReference { kind, ids: unknown })
    }
}

fn missing_snapshot(kind: ReferenceKind) -> DecisionError {
    let operation = match kind {
        ReferenceKind::Node => InventoryOperation::FetchTopology,
        ReferenceKind::Device => InventoryOperation::FetchDevices,
    };
    DecisionError::ContextUnavailable(InventoryError::NotFetched { operation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai4ne_core::{DeviceSelection, RoutePlan};

    fn topology() -> TopologyGraph {
        TopologyGraph::parse(
            r#"{"nodes":[{"id":"N1","start":true},{"id":"N2"},{"id":"N3"},{"id":"N4","end":true}],
                "edges":[{"source":"N1","target":"N2"},{"source":"N2","target":"N4"}]}"#,
        )
        .unwrap()
    }

    fn devices() -> DeviceSnapshot {
        DeviceSnapshot::new(r#"[{"id":"d1"},{"id":"d2"},{"id":3}]"#)
    }

    fn path(ids: &[&str]) -> RouteDecision {
        RouteDecision::Path(RoutePlan {
            selected_path: ids.iter().map(|s| s.to_string()).collect(),
            motivation: "m".to_string(),
        })
    }

    #[test]
    fn test_known_path_passes() {
        assert!(ReferenceValidator::validate(&path(&["N1", "N2", "N4"]), None, Some(&topology())).is_ok());
    }

    #[test]
    fn test_unknown_nodes_are_reported_once_in_order() {
        let err = ReferenceValidator::validate(
            &path(&["N1", "N9", "d1", "N9"]),
            None,
            Some(&topology()),
        )
        .unwrap_err();

        match err {
            DecisionError::UntrustedReference { kind, ids } => {
                assert_eq!(kind, ReferenceKind::Node);
                assert_eq!(ids, vec!["N9", "d1"]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_device_ids_checked_against_device_snapshot() {
        let ok = RouteDecision::Devices(DeviceSelection {
            selected_device_ids: vec!["d1".to_string(), "3".to_string()],
        });
        assert!(ReferenceValidator::validate(&ok, Some(&devices()), None).is_ok());

        let node_ids = RouteDecision::Devices(DeviceSelection {
            selected_device_ids: vec!["N1".to_string()],
        });
        let err = ReferenceValidator::validate(&node_ids, Some(&devices()), Some(&topology()))
            .unwrap_err();
        assert_eq!(err.kind(), "untrusted_reference");
    }

    #[test]
    fn test_missing_snapshot_is_context_unavailable() {
        let err = ReferenceValidator::validate(&path(&["N1"]), Some(&devices()), None).unwrap_err();
        match err {
            DecisionError::ContextUnavailable(inner) => {
                assert_eq!(inner.operation(), Some(InventoryOperation::FetchTopology));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_device_list_only_fails_device_selections() {
        let opaque = DeviceSnapshot::new(r#"[{"name":"d1","latency_ms":2}]"#);
        let selection = RouteDecision::Devices(DeviceSelection {
            selected_device_ids: vec!["d1".to_string()],
        });

        let err = ReferenceValidator::validate(&selection, Some(&opaque), None).unwrap_err();
        assert_eq!(err.kind(), "context_unavailable");

        assert!(
            ReferenceValidator::validate(&path(&["N1", "N4"]), Some(&opaque), Some(&topology()))
                .is_ok()
        );
    }
}
