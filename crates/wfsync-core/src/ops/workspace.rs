use chrono::{DateTime, Utc};
use serde_json::Value;

use super::store::{ReplaceOptions, WorkflowStore};
use super::subblock_store::{extract_values, SubBlockStore};
use crate::errors::{Result, WorkflowError};
use crate::model::WorkflowState;

/// The editing session: which workflow is open plus its two stores
///
/// Owned by the caller and handed to whoever mutates it; there is no
/// process-wide instance.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    active_workflow_id: Option<String>,
    workflow: WorkflowStore,
    subblocks: SubBlockStore,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_workflow_id(&self) -> Option<&str> {
        self.active_workflow_id.as_deref()
    }

    pub fn workflow_store(&self) -> &WorkflowStore {
        &self.workflow
    }

    pub fn subblock_store(&self) -> &SubBlockStore {
        &self.subblocks
    }

    /// Open `workflow_id` with `state` as its saved content
    ///
    /// Values of the previously active workflow stay in the value store.
    ///
    /// # Errors
    /// Structural violations in `state`; the workspace is unchanged on error.
    pub fn load_workflow(&mut self, workflow_id: impl Into<String>, state: WorkflowState) -> Result<()> {
        let workflow_id = workflow_id.into();
        let values = extract_values(&state);
        self.workflow
            .replace_workflow_state(state, ReplaceOptions::saved())?;
        self.subblocks.set_workflow_values(&workflow_id, values);
        tracing::debug!(workflow_id = %workflow_id, "loaded workflow");
        self.active_workflow_id = Some(workflow_id);
        Ok(())
    }

    /// Topology merged with live field values, `None` without an active workflow
    pub fn merged_state(&self) -> Option<WorkflowState> {
        let workflow_id = self.active_workflow_id.as_deref()?;
        let mut state = self.workflow.get_workflow_state().clone();
        state.blocks = self
            .subblocks
            .merge_subblock_state(&state.blocks, workflow_id);
        Some(state)
    }

    /// Write a full state into both stores of the active workflow
    ///
    /// # Errors
    /// * `InvalidState` - no active workflow
    /// * Structural violations in `state`; both stores are unchanged on error
    pub fn apply_state(&mut self, state: WorkflowState, options: ReplaceOptions) -> Result<()> {
        let workflow_id = self
            .active_workflow_id
            .clone()
            .ok_or_else(|| WorkflowError::InvalidState {
                reason: "No active workflow".to_string(),
            })?;

        let values = extract_values(&state);
        self.workflow.replace_workflow_state(state, options)?;
        self.subblocks.set_workflow_values(&workflow_id, values);
        Ok(())
    }

    /// Record a field edit on the active workflow; false without one
    pub fn set_sub_block_value(&mut self, block_id: &str, field_id: &str, value: Value) -> bool {
        match self.active_workflow_id.as_deref() {
            Some(workflow_id) => {
                self.subblocks.set_value(workflow_id, block_id, field_id, value);
                true
            }
            None => false,
        }
    }

    /// Stamp `last_saved` if `workflow_id` is still the active workflow
    pub fn mark_saved(&mut self, workflow_id: &str, at: DateTime<Utc>) -> bool {
        if self.active_workflow_id.as_deref() == Some(workflow_id) {
            self.workflow.mark_saved(at);
            true
        } else {
            false
        }
    }
}
