//! Lenient validation with repair
//!
//! Problems that can be fixed without guessing user intent (dangling edges,
//! broken parent links, non-finite coordinates, stale diff markers) are
//! repaired and reported as warnings. Problems that need a human decision
//! (names, mistyped field values) are reported as field errors and left in
//! place.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use super::invariants;
use crate::diff::markers::remove_markers;
use crate::model::{Position, WorkflowState};
use crate::ops::container_ops::regenerate_containers;

/// One blocking problem found by [`validate_and_sanitize`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl FieldError {
    fn on_block(block_id: &str, field: &str, message: impl Into<String>) -> Self {
        Self {
            block_id: Some(block_id.to_string()),
            field: Some(field.to_string()),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.block_id, &self.field) {
            (Some(block), Some(field)) => write!(f, "{}.{}: {}", block, field, self.message),
            (Some(block), None) => write!(f, "{}: {}", block, self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// Outcome of [`validate_and_sanitize`]
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizeReport {
    pub sanitized: WorkflowState,
    pub errors: Vec<FieldError>,
    pub warnings: Vec<String>,
}

impl SanitizeReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check `value` against the shape its field type requires
///
/// Unset (`null`) values are always accepted.
fn check_field_value(field_type: &str, value: &Value) -> Option<&'static str> {
    if value.is_null() {
        return None;
    }
    match field_type {
        "switch" if !value.is_boolean() => Some("switch value must be a boolean"),
        "slider" if !value.is_number() => Some("slider value must be a number"),
        "table" if !value.is_array() => Some("table value must be an array"),
        _ => None,
    }
}

/// Validate a state and return a repaired copy plus everything found
///
/// Never panics and never fails; callers decide from
/// [`SanitizeReport::is_valid`].
pub fn validate_and_sanitize(state: &WorkflowState) -> SanitizeReport {
    let mut sanitized = state.clone();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if remove_markers(&mut sanitized) {
        warnings.push("Removed leftover diff markers".to_string());
    }

    for (key, id) in invariants::find_key_id_mismatches(&sanitized) {
        errors.push(FieldError {
            block_id: Some(key.clone()),
            field: Some("id".to_string()),
            message: format!("block key '{}' does not match id '{}'", key, id),
        });
    }

    // Edges: drop anything that cannot be wired
    let mut seen = BTreeSet::new();
    let before = sanitized.edges.len();
    let blocks = &sanitized.blocks;
    sanitized.edges.retain(|edge| {
        let keep = !edge.id.trim().is_empty()
            && blocks.contains_key(&edge.source)
            && blocks.contains_key(&edge.target)
            && edge.source != edge.target
            && seen.insert(edge.id.clone());
        if !keep {
            warnings.push(format!(
                "Dropped edge '{}' ({} -> {})",
                edge.id, edge.source, edge.target
            ));
        }
        keep
    });
    let dropped_edges = before - sanitized.edges.len();

    // Parents: detach blocks from missing, non-container or cyclic parents
    let mut detach: Vec<String> = invariants::find_invalid_parents(&sanitized)
        .into_iter()
        .map(|(block_id, _, _)| block_id)
        .collect();
    detach.extend(invariants::find_parent_cycles(&sanitized));
    detach.sort();
    detach.dedup();
    for block_id in &detach {
        if let Some(block) = sanitized.block_mut(block_id) {
            warnings.push(format!(
                "Cleared invalid parent '{}' of block '{}'",
                block.parent_id().unwrap_or_default(),
                block_id
            ));
            block.set_parent_id(None);
        }
    }
    if !detach.is_empty() {
        regenerate_containers(&mut sanitized);
    }

    for block in sanitized.blocks.values_mut() {
        if !block.position.x.is_finite() || !block.position.y.is_finite() {
            warnings.push(format!("Reset non-finite position of block '{}'", block.id));
            block.position = Position::default();
        }
        if !block.height.is_finite() {
            block.height = 0.0;
        }
    }

    for block_id in invariants::find_empty_names(&sanitized) {
        errors.push(FieldError::on_block(&block_id, "name", "name cannot be empty"));
    }

    for (block_id, name, first_id) in invariants::find_duplicate_names(&sanitized) {
        errors.push(FieldError::on_block(
            &block_id,
            "name",
            format!("name '{}' is already used by block '{}'", name, first_id),
        ));
    }

    for block in sanitized.blocks.values() {
        for sub in block.sub_blocks.values() {
            if let Some(message) = check_field_value(&sub.sub_block_type, &sub.value) {
                errors.push(FieldError::on_block(&block.id, &sub.id, message));
            }
        }
    }

    tracing::debug!(
        errors = errors.len(),
        warnings = warnings.len(),
        dropped_edges,
        "sanitized workflow state"
    );

    SanitizeReport {
        sanitized,
        errors,
        warnings,
    }
}
