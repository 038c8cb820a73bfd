//! Functional-boundary apply function
//!
//! [`apply`] is the entry point for atomic edits of a workflow state.
//!
//! ## Atomicity Contract
//!
//! - **All-or-nothing**: either the command succeeds and a valid new state is
//!   returned, or it fails and the caller's previous state stays valid
//! - **No panics**: invalid input returns typed errors
//! - **Validated commits**: structural commands are checked against the
//!   workflow invariants before the new state is returned
//!
//! ## Example
//!
//! ```
//! use wfsync_core::{apply, Command};
//! use wfsync_core::model::{BlockState, WorkflowState};
//!
//! let state = WorkflowState::new();
//! let cmd = Command::AddBlock {
//!     block: BlockState::new("start", "starter", "Start"),
//! };
//!
//! let new_state = apply(state, cmd).unwrap();
//! assert!(new_state.contains_block("start"));
//! ```

use crate::commands::Command;
use crate::errors::Result;
use crate::model::WorkflowState;
use crate::ops::{block_ops, edge_ops};
use crate::rules::validation;

/// Apply a command to a state, returning the new state
///
/// Takes ownership of `state`. Callers that need the old state on error
/// should pass a clone; the ops mutate in place and may have partially
/// run when an error is returned.
///
/// # Errors
///
/// Returns the `WorkflowError` of the failing op, or the first invariant
/// violation found after a structural command.
pub fn apply(mut state: WorkflowState, cmd: Command) -> Result<WorkflowState> {
    let structural = cmd.is_structural();
    tracing::debug!(op = cmd.op_name(), "applying command");

    match cmd {
        Command::AddBlock { block } => block_ops::add_block(&mut state, block)?,

        Command::RemoveBlock { block_id } => {
            block_ops::remove_block(&mut state, &block_id)?;
        }

        Command::RenameBlock { block_id, name } => {
            block_ops::rename_block(&mut state, &block_id, name)?
        }

        Command::UpdateParent {
            block_id,
            parent_id,
        } => block_ops::update_parent(&mut state, &block_id, parent_id)?,

        Command::SetBlockEnabled { block_id, enabled } => {
            block_ops::set_block_enabled(&mut state, &block_id, enabled)?
        }

        Command::SetBlockLocked { block_id, locked } => {
            block_ops::set_block_locked(&mut state, &block_id, locked)?;
        }

        Command::SetSubBlockValue {
            block_id,
            field_id,
            value,
        } => block_ops::set_sub_block_value(&mut state, &block_id, &field_id, value)?,

        Command::AddEdge { edge } => edge_ops::add_edge(&mut state, edge)?,

        Command::RemoveEdge { edge_id } => {
            edge_ops::remove_edge(&mut state, &edge_id)?;
        }
    }

    if structural {
        validation::validate_workflow_state(&state)?;
    }

    Ok(state)
}
