//! Diff computation engine.
//!
//! [`compute_analysis`] compares two states block by block; [`create_diff`]
//! wraps it with input checks, markers and provenance metadata.

use chrono::Utc;
use std::collections::BTreeSet;

use crate::diff::markers::apply_markers;
use crate::diff::model::{DiffAnalysis, DiffMetadata, DiffResult, EdgeDiff, WorkflowDiff};
use crate::model::{BlockData, BlockState, FieldDiff, WorkflowState};
use crate::snapshot::digest::state_digest;

/// Block-level properties compared in addition to field values
///
/// Position and height are layout and never count as edits. The `data.*`
/// entries are container configuration read by loop/parallel regeneration.
pub const COMPARED_BLOCK_PROPERTIES: &[&str] = &[
    "name",
    "type",
    "enabled",
    "advancedMode",
    "triggerMode",
    "parentId",
    "data.count",
    "data.loopType",
    "data.parallelType",
    "data.collection",
    "data.whileCondition",
];

fn data_changed<T: PartialEq>(
    before: &BlockState,
    after: &BlockState,
    field: fn(&BlockData) -> Option<&T>,
) -> bool {
    before.data.as_ref().and_then(field) != after.data.as_ref().and_then(field)
}

fn changed_properties(before: &BlockState, after: &BlockState) -> Vec<&'static str> {
    let checks = [
        before.name != after.name,
        before.block_type != after.block_type,
        before.enabled != after.enabled,
        before.advanced_mode != after.advanced_mode,
        before.trigger_mode != after.trigger_mode,
        before.parent_id() != after.parent_id(),
        data_changed(before, after, |d| d.count.as_ref()),
        data_changed(before, after, |d| d.loop_type.as_ref()),
        data_changed(before, after, |d| d.parallel_type.as_ref()),
        data_changed(before, after, |d| d.collection.as_ref()),
        data_changed(before, after, |d| d.while_condition.as_ref()),
    ];
    COMPARED_BLOCK_PROPERTIES
        .iter()
        .zip(checks)
        .filter(|(_, changed)| *changed)
        .map(|(name, _)| *name)
        .collect()
}

/// Compare one block present on both sides
///
/// `changed_fields` lists changed field ids then changed properties, each
/// group sorted. Fields present on one side only count as changed.
pub fn compare_block(before: &BlockState, after: &BlockState) -> FieldDiff {
    let all_fields: BTreeSet<&String> = before
        .sub_blocks
        .keys()
        .chain(after.sub_blocks.keys())
        .collect();

    let mut changed_fields = Vec::new();
    let mut unchanged_fields = Vec::new();
    for field_id in all_fields {
        let same = match (before.sub_blocks.get(field_id), after.sub_blocks.get(field_id)) {
            (Some(b), Some(a)) => b.value == a.value,
            _ => false,
        };
        if same {
            unchanged_fields.push(field_id.clone());
        } else {
            changed_fields.push(field_id.clone());
        }
    }

    changed_fields.extend(
        changed_properties(before, after)
            .into_iter()
            .map(str::to_string),
    );

    FieldDiff {
        changed_fields,
        unchanged_fields,
    }
}

/// Structural diff of `baseline` against `proposed`
///
/// Markers on either side are ignored. Deterministic: ids come out sorted.
pub fn compute_analysis(baseline: &WorkflowState, proposed: &WorkflowState) -> DiffAnalysis {
    let mut analysis = DiffAnalysis::default();

    for (id, after) in &proposed.blocks {
        match baseline.blocks.get(id) {
            None => analysis.new_blocks.push(id.clone()),
            Some(before) => {
                let field_diff = compare_block(before, after);
                if !field_diff.changed_fields.is_empty() {
                    analysis.edited_blocks.push(id.clone());
                    analysis.field_diffs.insert(id.clone(), field_diff);
                }
            }
        }
    }

    analysis.deleted_blocks = baseline
        .blocks
        .keys()
        .filter(|id| !proposed.blocks.contains_key(*id))
        .cloned()
        .collect();

    let baseline_edges: BTreeSet<&str> = baseline.edges.iter().map(|e| e.id.as_str()).collect();
    let proposed_edges: BTreeSet<&str> = proposed.edges.iter().map(|e| e.id.as_str()).collect();
    analysis.edge_diff = EdgeDiff {
        new_edges: proposed_edges
            .difference(&baseline_edges)
            .map(|s| s.to_string())
            .collect(),
        deleted_edges: baseline_edges
            .difference(&proposed_edges)
            .map(|s| s.to_string())
            .collect(),
    };

    tracing::debug!(
        new_blocks = analysis.new_blocks.len(),
        edited_blocks = analysis.edited_blocks.len(),
        deleted_blocks = analysis.deleted_blocks.len(),
        new_edges = analysis.edge_diff.new_edges.len(),
        deleted_edges = analysis.edge_diff.deleted_edges.len(),
        "computed diff analysis"
    );

    analysis
}

/// Analysis used when there is nothing to compare against
fn all_new(proposed: &WorkflowState) -> DiffAnalysis {
    DiffAnalysis {
        new_blocks: proposed.blocks.keys().cloned().collect(),
        edge_diff: EdgeDiff {
            new_edges: proposed
                .edges
                .iter()
                .map(|e| e.id.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            deleted_edges: Vec::new(),
        },
        ..DiffAnalysis::default()
    }
}

fn check_proposed_shape(proposed: &WorkflowState) -> Vec<String> {
    let mut errors = Vec::new();
    for (key, block) in &proposed.blocks {
        if key.trim().is_empty() || block.id.trim().is_empty() {
            errors.push(format!("Block under key '{}' has an empty id", key));
        } else if key != &block.id {
            errors.push(format!(
                "Block key '{}' does not match block id '{}'",
                key, block.id
            ));
        }
    }
    errors
}

fn check_supplied_analysis(proposed: &WorkflowState, analysis: &DiffAnalysis) -> Vec<String> {
    analysis
        .new_blocks
        .iter()
        .map(|id| ("new", id))
        .chain(analysis.edited_blocks.iter().map(|id| ("edited", id)))
        .filter(|(_, id)| !proposed.contains_block(id))
        .map(|(kind, id)| {
            format!(
                "Supplied analysis lists {} block '{}' which is not in the proposed state",
                kind, id
            )
        })
        .collect()
}

/// Compute a diff and the marked candidate state
///
/// - `analysis`: used verbatim when supplied, after checking that every
///   new/edited id exists in `proposed`
/// - `baseline`: when absent (and no analysis supplied) every block and edge
///   counts as new
///
/// Failures come back as `success == false` with human-readable errors;
/// this function never panics.
pub fn create_diff(
    proposed: &WorkflowState,
    analysis: Option<DiffAnalysis>,
    baseline: Option<&WorkflowState>,
    source: &str,
) -> DiffResult {
    let mut errors = check_proposed_shape(proposed);
    if let Some(supplied) = &analysis {
        errors.extend(check_supplied_analysis(proposed, supplied));
    }
    if !errors.is_empty() {
        tracing::debug!(errors = errors.len(), "rejected diff input");
        return DiffResult::failed(errors);
    }

    let analysis = match (analysis, baseline) {
        (Some(supplied), _) => supplied,
        (None, Some(baseline)) => compute_analysis(baseline, proposed),
        (None, None) => all_new(proposed),
    };

    let proposed_digest = match state_digest(proposed) {
        Ok(d) => d,
        Err(e) => return DiffResult::failed(vec![format!("Failed to digest proposed state: {}", e)]),
    };
    let baseline_digest = match baseline.map(state_digest).transpose() {
        Ok(d) => d,
        Err(e) => return DiffResult::failed(vec![format!("Failed to digest baseline state: {}", e)]),
    };

    let mut candidate = proposed.clone();
    apply_markers(&mut candidate, &analysis);

    DiffResult::ok(WorkflowDiff {
        proposed_state: candidate,
        diff_analysis: analysis,
        metadata: DiffMetadata {
            source: source.to_string(),
            created_at: Utc::now(),
            baseline_digest,
            proposed_digest,
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{DiffStatus, Edge};
    use serde_json::json;

    fn agent(id: &str, prompt: &str) -> BlockState {
        BlockState::new(id, "agent", format!("Agent {}", id))
            .with_sub_block("prompt", "long-input", json!(prompt))
            .with_sub_block("model", "dropdown", json!("gpt-4o"))
    }

    #[test]
    fn test_layout_changes_are_not_edits() {
        let before = agent("a", "hi");
        let mut after = before.clone().at(300.0, 40.0);
        after.height = 120.0;

        assert!(compare_block(&before, &after).changed_fields.is_empty());
    }

    #[test]
    fn test_property_changes_are_edits() {
        let before = agent("a", "hi");
        let mut after = before.clone();
        after.enabled = false;
        after.name = "Renamed".to_string();

        let diff = compare_block(&before, &after);
        assert_eq!(diff.changed_fields, vec!["name".to_string(), "enabled".to_string()]);
        assert_eq!(diff.unchanged_fields, vec!["model".to_string(), "prompt".to_string()]);
    }

    #[test]
    fn test_added_field_counts_as_changed() {
        let before = agent("a", "hi");
        let after = before.clone().with_sub_block("temperature", "slider", json!(0.3));
        assert_eq!(compare_block(&before, &after).changed_fields, vec!["temperature".to_string()]);
    }

    #[test]
    fn test_no_baseline_means_everything_new() {
        let proposed = WorkflowState::new()
            .with_block(agent("a", "hi"))
            .with_block(agent("b", "yo"))
            .with_edge(Edge::new("e1", "a", "b"));

        let diff = create_diff(&proposed, None, None, "copilot").into_result().unwrap();

        assert_eq!(diff.diff_analysis.new_blocks, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(diff.diff_analysis.edge_diff.new_edges, vec!["e1".to_string()]);
        assert!(diff.metadata.baseline_digest.is_none());
        assert_eq!(diff.proposed_state.block("a").unwrap().is_diff, Some(DiffStatus::New));
    }

    #[test]
    fn test_key_id_mismatch_fails_without_panicking() {
        let mut proposed = WorkflowState::new();
        proposed.blocks.insert("x".to_string(), agent("y", "hi"));

        let result = create_diff(&proposed, None, None, "copilot");
        assert!(!result.success);
        assert!(result.diff.is_none());
        assert!(result.errors[0].contains("does not match"));
    }

    #[test]
    fn test_supplied_analysis_with_unknown_id_fails() {
        let proposed = WorkflowState::new().with_block(agent("a", "hi"));
        let supplied = DiffAnalysis {
            edited_blocks: vec!["ghost".to_string()],
            ..DiffAnalysis::default()
        };

        let err = create_diff(&proposed, Some(supplied), None, "copilot")
            .into_result()
            .unwrap_err();
        assert_eq!(err.code(), "ERR_DIFF_COMPUTATION_FAILED");
        assert!(err.message().contains("ghost"));
    }
}
