use crate::errors::{Result, WorkflowError};
use crate::model::WorkflowState;

use super::invariants;

/// Validate the structural invariants of a workflow state
///
/// Checks, in order:
///
/// 1. Map keys agree with embedded block ids and no id is empty
/// 2. Edge ids are non-empty and unique
/// 3. Edges reference existing blocks and never loop on one block
/// 4. `parentId` references an existing loop/parallel block
/// 5. No block is its own ancestor
/// 6. Edges close no cycle outside a loop/parallel subflow
///
/// Names and field values are not checked here; see
/// [`validate_and_sanitize`](super::sanitize::validate_and_sanitize).
///
/// # Errors
/// Returns the first violation found. For exhaustive reporting, call the
/// individual invariant functions directly.
pub fn validate_workflow_state(state: &WorkflowState) -> Result<()> {
    if let Some((key, id)) = invariants::find_key_id_mismatches(state).first() {
        return Err(WorkflowError::InvalidState {
            reason: if id.trim().is_empty() {
                format!("Block under key '{}' has an empty id", key)
            } else {
                format!("Block key '{}' does not match block id '{}'", key, id)
            },
        });
    }

    if let Some((source, target)) = invariants::find_empty_edge_ids(state).first() {
        return Err(WorkflowError::InvalidState {
            reason: format!("Edge {} -> {} has an empty id", source, target),
        });
    }

    if let Some(edge_id) = invariants::find_duplicate_edge_ids(state).first() {
        return Err(WorkflowError::EdgeAlreadyExists {
            edge_id: edge_id.clone(),
        });
    }

    if let Some((edge_id, block_id)) = invariants::find_dangling_edges(state).first() {
        return Err(WorkflowError::DanglingEdge {
            edge_id: edge_id.clone(),
            block_id: block_id.clone(),
        });
    }

    if let Some((edge_id, block_id)) = invariants::find_self_edges(state).first() {
        return Err(WorkflowError::SelfEdge {
            edge_id: edge_id.clone(),
            block_id: block_id.clone(),
        });
    }

    if let Some((block_id, parent_id, reason)) = invariants::find_invalid_parents(state).first() {
        return Err(WorkflowError::InvalidParent {
            block_id: block_id.clone(),
            parent_id: parent_id.clone(),
            reason: reason.clone(),
        });
    }

    if let Some(block_id) = invariants::find_parent_cycles(state).first() {
        return Err(WorkflowError::InvalidParent {
            block_id: block_id.clone(),
            parent_id: state
                .block(block_id)
                .and_then(|b| b.parent_id())
                .unwrap_or_default()
                .to_string(),
            reason: "block is nested inside itself".to_string(),
        });
    }

    if let Some((edge_id, source_id, target_id)) = invariants::find_edge_cycles(state).first() {
        return Err(WorkflowError::CycleDetected {
            edge_id: edge_id.clone(),
            source_id: source_id.clone(),
            target_id: target_id.clone(),
        });
    }

    Ok(())
}
