//! Diff output types.
//!
//! Collections use `BTreeMap` and sorted `Vec` for deterministic serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{ExError, ExErrorKind};
use crate::model::{FieldDiff, WorkflowState};

/// Set-delta of edge ids between baseline and proposal
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeDiff {
    /// Edge ids present only in the proposal
    pub new_edges: Vec<String>,
    /// Edge ids present only in the baseline
    pub deleted_edges: Vec<String>,
}

/// Structural comparison of a baseline and a proposed workflow
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffAnalysis {
    /// Block ids present only in the proposal
    pub new_blocks: Vec<String>,
    /// Block ids present on both sides with at least one changed field or property
    pub edited_blocks: Vec<String>,
    /// Block ids present only in the baseline
    pub deleted_blocks: Vec<String>,
    /// Changed/unchanged field ids for each edited block
    #[serde(default)]
    pub field_diffs: BTreeMap<String, FieldDiff>,
    #[serde(default)]
    pub edge_diff: EdgeDiff,
}

impl DiffAnalysis {
    /// True when applying the proposal would change nothing
    pub fn is_empty(&self) -> bool {
        self.new_blocks.is_empty()
            && self.edited_blocks.is_empty()
            && self.deleted_blocks.is_empty()
            && self.field_diffs.values().all(|f| f.changed_fields.is_empty())
            && self.edge_diff.new_edges.is_empty()
            && self.edge_diff.deleted_edges.is_empty()
    }

    /// Number of block and edge changes
    pub fn change_count(&self) -> usize {
        self.new_blocks.len()
            + self.edited_blocks.len()
            + self.deleted_blocks.len()
            + self.edge_diff.new_edges.len()
            + self.edge_diff.deleted_edges.len()
    }
}

/// Provenance of a computed diff
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffMetadata {
    /// Who proposed the change (e.g. `copilot`)
    pub source: String,
    pub created_at: DateTime<Utc>,
    /// Digest of the marker-free baseline, `None` when diffing from scratch
    pub baseline_digest: Option<String>,
    /// Digest of the marker-free proposal
    pub proposed_digest: String,
}

/// A computed diff: candidate state with markers plus its analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowDiff {
    pub proposed_state: WorkflowState,
    pub diff_analysis: DiffAnalysis,
    pub metadata: DiffMetadata,
}

/// Outcome of [`create_diff`](super::engine::create_diff)
#[derive(Debug, Clone, PartialEq)]
pub struct DiffResult {
    pub success: bool,
    pub diff: Option<WorkflowDiff>,
    pub errors: Vec<String>,
}

impl DiffResult {
    pub(crate) fn ok(diff: WorkflowDiff) -> Self {
        Self {
            success: true,
            diff: Some(diff),
            errors: Vec::new(),
        }
    }

    pub(crate) fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            diff: None,
            errors,
        }
    }

    /// Convert into a `Result`, folding all messages into the error details
    ///
    /// # Errors
    /// `DiffComputationFailed` when the diff could not be computed.
    pub fn into_result(self) -> Result<WorkflowDiff, ExError> {
        match self.diff {
            Some(diff) if self.success => Ok(diff),
            _ => Err(ExError::new(ExErrorKind::DiffComputationFailed)
                .with_op("create_diff")
                .with_message(
                    self.errors
                        .first()
                        .cloned()
                        .unwrap_or_else(|| "diff computation failed".to_string()),
                )
                .with_details(self.errors)),
        }
    }
}
