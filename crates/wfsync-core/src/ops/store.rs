use chrono::{DateTime, Utc};

use super::container_ops::regenerate_containers;
use crate::errors::Result;
use crate::model::WorkflowState;
use crate::rules::validation::validate_workflow_state;

/// Options for [`WorkflowStore::replace_workflow_state`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOptions {
    /// Stamp `last_saved` with the current time
    pub update_last_saved: bool,
}

impl ReplaceOptions {
    pub fn saved() -> Self {
        Self {
            update_last_saved: true,
        }
    }
}

/// Holds the topology (blocks, edges, containers) of the active workflow
///
/// Field values live here too, but the live copy of values is the
/// [`SubBlockStore`](super::SubBlockStore); merge the two for a full state.
#[derive(Debug, Clone, Default)]
pub struct WorkflowStore {
    state: WorkflowState,
    last_saved: Option<DateTime<Utc>>,
}

impl WorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current topology
    pub fn get_workflow_state(&self) -> &WorkflowState {
        &self.state
    }

    /// Replace the whole state atomically
    ///
    /// Any `loops`/`parallels` carried by `state` are discarded and rebuilt
    /// from the incoming blocks' parent links and container settings. The
    /// result is validated before it is committed. On error the previous
    /// state is kept.
    ///
    /// # Errors
    /// Any structural violation reported by `validate_workflow_state`.
    pub fn replace_workflow_state(
        &mut self,
        mut state: WorkflowState,
        options: ReplaceOptions,
    ) -> Result<()> {
        regenerate_containers(&mut state);
        validate_workflow_state(&state)?;

        tracing::debug!(
            blocks = state.blocks.len(),
            edges = state.edges.len(),
            update_last_saved = options.update_last_saved,
            "replacing workflow state"
        );

        self.state = state;
        if options.update_last_saved {
            self.last_saved = Some(Utc::now());
        }
        Ok(())
    }

    /// Mutable access for in-place edits that do not change topology
    pub fn state_mut(&mut self) -> &mut WorkflowState {
        &mut self.state
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }

    pub fn mark_saved(&mut self, at: DateTime<Utc>) {
        self.last_saved = Some(at);
    }
}
