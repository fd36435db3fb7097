//! # Condition Evaluation
//!
//! Decides whether a status condition of a generic resource is satisfied.

use crate::document::Document;
use serde_json::Value;

/// Returns `true` when `status.conditions` holds an entry of `condition_type`
/// whose status is `"True"` (compared ignoring ASCII case)
///
/// Absent resources, missing or malformed condition lists and malformed entries all
/// evaluate to `false`. The type comparison is exact.
pub fn is_condition_true(resource: Option<&Document>, condition_type: &str) -> bool {
    let Some(resource) = resource else {
        return false;
    };
    let Ok(Some(conditions)) = resource.nested_slice(&["status", "conditions"]) else {
        return false;
    };

    conditions
        .iter()
        .filter_map(Value::as_object)
        .filter(|entry| entry.get("type").and_then(Value::as_str) == Some(condition_type))
        .any(|entry| {
            entry
                .get("status")
                .and_then(Value::as_str)
                .is_some_and(|status| status.eq_ignore_ascii_case("true"))
        })
}
