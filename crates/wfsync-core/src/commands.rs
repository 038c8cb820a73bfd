//! Command types for single-step workflow edits
//!
//! Commands are processed by [`apply`](crate::apply::apply), which takes
//! ownership of the current state and returns the edited state or an error.

use serde_json::Value;

use crate::model::{BlockState, Edge};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Add a block (container descriptors regenerate when relevant)
    AddBlock { block: BlockState },

    /// Remove a block with its descendants and touching edges
    RemoveBlock { block_id: String },

    /// Rename a block, enforcing normalized-name uniqueness
    RenameBlock { block_id: String, name: String },

    /// Move a block into a container, or to the top level with `None`
    UpdateParent {
        block_id: String,
        parent_id: Option<String>,
    },

    SetBlockEnabled { block_id: String, enabled: bool },

    /// Lock or unlock; containers cascade to descendants
    SetBlockLocked { block_id: String, locked: bool },

    SetSubBlockValue {
        block_id: String,
        field_id: String,
        value: Value,
    },

    AddEdge { edge: Edge },

    RemoveEdge { edge_id: String },
}

impl Command {
    /// Stable operation name, used as the `op` log field
    pub fn op_name(&self) -> &'static str {
        match self {
            Command::AddBlock { .. } => "add_block",
            Command::RemoveBlock { .. } => "remove_block",
            Command::RenameBlock { .. } => "rename_block",
            Command::UpdateParent { .. } => "update_parent",
            Command::SetBlockEnabled { .. } => "set_block_enabled",
            Command::SetBlockLocked { .. } => "set_block_locked",
            Command::SetSubBlockValue { .. } => "set_sub_block_value",
            Command::AddEdge { .. } => "add_edge",
            Command::RemoveEdge { .. } => "remove_edge",
        }
    }

    /// True for commands that can change blocks, edges or containment
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            Command::SetBlockEnabled { .. }
                | Command::SetBlockLocked { .. }
                | Command::SetSubBlockValue { .. }
        )
    }
}
