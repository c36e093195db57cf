use std::fmt;
use thiserror::Error;

use crate::inventory::InventoryError;

/// Which snapshot an identifier was expected to come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Node,
    Device,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Node => write!(f, "node"),
            ReferenceKind::Device => write!(f, "device"),
        }
    }
}

/// Failure taxonomy of a single routing decision.
///
/// Everything except `ToolExecution` aborts the in-flight request. Tool failures are
/// reported back into the conversation as text and only surface here when a caller
/// wants to inspect them.
#[derive(Error, Debug)]
pub enum DecisionError {
    #[error("Context unavailable: {0}")]
    ContextUnavailable(#[from] InventoryError),

    #[error("Tool execution failed ({tool}): {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Decision timeout: {0}")]
    DecisionTimeout(String),

    #[error("Malformed model output: {0}")]
    MalformedModelOutput(String),

    #[error("Untrusted {kind} reference(s) not present in snapshot: {}", ids.join(", "))]
    UntrustedReference { kind: ReferenceKind, ids: Vec<String> },

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),
}

impl DecisionError {
    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            DecisionError::ContextUnavailable(_) => "context_unavailable",
            DecisionError::ToolExecution { .. } => "tool_execution_error",
            DecisionError::DecisionTimeout(_) => "decision_timeout",
            DecisionError::MalformedModelOutput(_) => "malformed_model_output",
            DecisionError::UntrustedReference { .. } => "untrusted_reference",
            DecisionError::ModelUnavailable(_) => "model_unavailable",
            DecisionError::InvalidPrompt(_) => "invalid_prompt",
        }
    }

    pub fn is_fatal(&self) -> bool {
        !matches!(self, DecisionError::ToolExecution { .. })
    }
}

pub type Result<T> = std::result::Result<T, DecisionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InventoryOperation;

    #[test]
    fn test_error_kinds_are_distinct() {
        let errors = vec![
            DecisionError::ContextUnavailable(InventoryError::Status {
                operation: InventoryOperation::FetchDevices,
                status: 500,
                body: String::new(),
            }),
            DecisionError::ToolExecution {
                tool: "route".to_string(),
                message: "boom".to_string(),
            },
            DecisionError::DecisionTimeout("rounds".to_string()),
            DecisionError::MalformedModelOutput("not json".to_string()),
            DecisionError::UntrustedReference {
                kind: ReferenceKind::Node,
                ids: vec!["N9".to_string()],
            },
            DecisionError::ModelUnavailable("down".to_string()),
            DecisionError::InvalidPrompt("missing var".to_string()),
        ];

        let mut kinds: Vec<_> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_only_tool_errors_are_recoverable() {
        let tool = DecisionError::ToolExecution {
            tool: "fetchDevices".to_string(),
            message: "timeout".to_string(),
        };
        assert!(!tool.is_fatal());
        assert!(DecisionError::DecisionTimeout("x".to_string()).is_fatal());
    }

    #[test]
    fn test_untrusted_reference_lists_ids() {
        let err = DecisionError::UntrustedReference {
            kind: ReferenceKind::Device,
            ids: vec!["d7".to_string(), "d8".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Untrusted device reference(s) not present in snapshot: d7, d8"
        );
    }
}
