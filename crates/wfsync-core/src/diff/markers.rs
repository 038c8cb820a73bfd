//! Diff markers embedded in a candidate state.
//!
//! Markers (`is_diff`, `field_diffs`) let the UI highlight what a proposal
//! changes. They must never reach broadcast or persistence; strip them with
//! [`remove_markers`] or [`without_markers`] first.

use crate::model::{DiffStatus, FieldDiff, WorkflowState};

use super::model::DiffAnalysis;

/// Write the markers described by `analysis` onto `state`
///
/// Blocks absent from the analysis have stale markers cleared. Returns
/// whether anything changed, so a second call with the same analysis is a
/// no-op returning `false`.
pub fn apply_markers(state: &mut WorkflowState, analysis: &DiffAnalysis) -> bool {
    let mut changed = false;

    for (id, block) in state.blocks.iter_mut() {
        let is_new = analysis.new_blocks.contains(id);
        let is_edited = !is_new && analysis.edited_blocks.contains(id);

        let status = if is_new {
            Some(DiffStatus::New)
        } else if is_edited {
            Some(DiffStatus::Edited)
        } else {
            None
        };
        let field_diff: Option<FieldDiff> = if is_edited {
            Some(analysis.field_diffs.get(id).cloned().unwrap_or_default())
        } else {
            None
        };

        for (field_id, sub) in block.sub_blocks.iter_mut() {
            let desired = field_diff
                .as_ref()
                .filter(|f| f.changed_fields.contains(field_id))
                .map(|_| DiffStatus::Edited);
            if sub.is_diff != desired {
                sub.is_diff = desired;
                changed = true;
            }
        }

        if block.is_diff != status {
            block.is_diff = status;
            changed = true;
        }
        if block.field_diffs != field_diff {
            block.field_diffs = field_diff;
            changed = true;
        }
    }

    changed
}

/// Strip every marker from `state`; returns whether any was present
pub fn remove_markers(state: &mut WorkflowState) -> bool {
    let mut changed = false;
    for block in state.blocks.values_mut() {
        changed |= block.is_diff.take().is_some();
        changed |= block.field_diffs.take().is_some();
        for sub in block.sub_blocks.values_mut() {
            changed |= sub.is_diff.take().is_some();
        }
    }
    changed
}

/// Marker-free copy of `state`
pub fn without_markers(state: &WorkflowState) -> WorkflowState {
    let mut clean = state.clone();
    remove_markers(&mut clean);
    clean
}

/// True if any block or field carries a marker
pub fn has_markers(state: &WorkflowState) -> bool {
    state.blocks.values().any(|b| b.has_markers())
}
