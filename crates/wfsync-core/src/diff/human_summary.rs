//! Human-readable summary renderer for workflow diffs.

use crate::diff::model::DiffAnalysis;
use crate::model::WorkflowState;

/// Render a Markdown summary of a [`DiffAnalysis`].
///
/// When `state` is supplied, blocks are labelled by name; deleted blocks
/// are only found in the baseline so they fall back to their id unless the
/// baseline is passed. Informational only.
pub fn render_human_summary(analysis: &DiffAnalysis, state: Option<&WorkflowState>) -> String {
    let mut out = String::new();
    out.push_str("## Workflow Diff\n\n");

    if analysis.is_empty() {
        out.push_str("_No changes detected._\n");
        return out;
    }

    let label = |id: &str| -> String {
        match state.and_then(|s| s.block(id)) {
            Some(block) => format!("{} (`{}`)", block.name, id),
            None => format!("`{}`", id),
        }
    };

    out.push_str(&format!("**Changes**: {}\n\n", analysis.change_count()));

    if !analysis.new_blocks.is_empty() {
        out.push_str(&format!("### Added Blocks ({})\n\n", analysis.new_blocks.len()));
        for id in &analysis.new_blocks {
            out.push_str(&format!("- {}\n", label(id)));
        }
        out.push('\n');
    }

    if !analysis.edited_blocks.is_empty() {
        out.push_str(&format!("### Edited Blocks ({})\n\n", analysis.edited_blocks.len()));
        for id in &analysis.edited_blocks {
            match analysis.field_diffs.get(id) {
                Some(fields) if !fields.changed_fields.is_empty() => out.push_str(&format!(
                    "- {}: {}\n",
                    label(id),
                    fields.changed_fields.join(", ")
                )),
                _ => out.push_str(&format!("- {}\n", label(id))),
            }
        }
        out.push('\n');
    }

    if !analysis.deleted_blocks.is_empty() {
        out.push_str(&format!("### Deleted Blocks ({})\n\n", analysis.deleted_blocks.len()));
        for id in &analysis.deleted_blocks {
            out.push_str(&format!("- {}\n", label(id)));
        }
        out.push('\n');
    }

    let edges = &analysis.edge_diff;
    if !edges.new_edges.is_empty() || !edges.deleted_edges.is_empty() {
        out.push_str("### Connections\n\n");
        for id in &edges.new_edges {
            out.push_str(&format!("- **Added** {}\n", edge_label(state, id)));
        }
        for id in &edges.deleted_edges {
            out.push_str(&format!("- **Removed** {}\n", edge_label(state, id)));
        }
    }

    out
}

fn edge_label(state: Option<&WorkflowState>, edge_id: &str) -> String {
    match state.and_then(|s| s.edge(edge_id)) {
        Some(edge) => format!("`{}` ({} -> {})", edge_id, edge.source, edge.target),
        None => format!("`{}`", edge_id),
    }
}
