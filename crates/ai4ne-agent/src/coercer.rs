// ABOUTME: Response coercer turning the model's terminal text into a typed RouteDecision
// ABOUTME: Rejects anything that does not match the contract; there is no best-guess result

use ai4ne_core::{
    DecisionContract, DecisionError, DeviceSelection, Result, RouteDecision, RoutePlan,
};
use tracing::warn;

pub struct ResponseCoercer;

impl ResponseCoercer {
    pub fn coerce(content: &str, contract: DecisionContract) -> Result<RouteDecision> {
        let decision = match contract {
            DecisionContract::Path => Self::route_plan(content).map(RouteDecision::Path),
            DecisionContract::Devices => {
                Self::device_selection(content).map(RouteDecision::Devices)
            }
        };

        if let Err(e) = &decision {
            warn!(contract = %contract, error = %e, "Rejected terminal model output");
        }
        decision
    }

    /// `{selectedPath: [..], motivation: ".."}`, optionally inside one code fence
    pub fn route_plan(content: &str) -> Result<RoutePlan> {
        let body = strip_code_fence(content);
        let plan: RoutePlan = serde_json::from_str(body).map_err(|e| {
            DecisionError::MalformedModelOutput(format!("expected a route plan object: {}", e))
        })?;

        if plan.selected_path.is_empty() {
            return Err(DecisionError::MalformedModelOutput(
                "selectedPath is empty".to_string(),
            ));
        }
        if plan.selected_path.iter().any(|id| id.trim().is_empty()) {
            return Err(DecisionError::MalformedModelOutput(
                "selectedPath contains a blank identifier".to_string(),
            ));
        }
        if plan.motivation.trim().is_empty() {
            return Err(DecisionError::MalformedModelOutput(
                "motivation is blank".to_string(),
            ));
        }

        Ok(plan)
    }

    /// Comma-separated identifiers, trimmed
    pub fn device_selection(content: &str) -> Result<DeviceSelection> {
        let content = content.trim();
        if content.is_empty() {
            return Err(DecisionError::MalformedModelOutput(
                "expected a comma-separated list of device ids, got nothing".to_string(),
            ));
        }

        let mut selected_device_ids = Vec::new();
        for entry in content.split(',').map(str::trim) {
            if entry.is_empty() {
                return Err(DecisionError::MalformedModelOutput(format!(
                    "empty entry in device list '{}'",
                    content
                )));
            }
            selected_device_ids.push(entry.to_string());
        }

        Ok(DeviceSelection {
            selected_device_ids,
        })
    }
}

/// Remove one surrounding ``` or ```json fence
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return trimmed;
    };

    // drop the info string on the opening line
    match inner.find('\n') {
        Some(newline) if !inner[..newline].trim_start().starts_with('{') => {
            inner[newline + 1..].trim()
        }
        _ => inner.trim(),
    }
}
