use serde_json::Value;

use super::container_ops::regenerate_containers;
use crate::errors::{Result, WorkflowError};
use crate::model::{BlockState, WorkflowState};

/// Normalize a block name for uniqueness checks
///
/// Lowercases and removes all whitespace, so `"Agent 1"` and `"agent1"`
/// collide.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Check that `name` is usable by `block_id`
///
/// # Errors
/// * `InvalidBlockName` - name is empty or whitespace-only
/// * `DuplicateBlockName` - another block normalizes to the same name
pub fn ensure_name_available(state: &WorkflowState, block_id: &str, name: &str) -> Result<()> {
    let normalized = normalize_name(name);
    if normalized.is_empty() {
        return Err(WorkflowError::InvalidBlockName {
            block_id: block_id.to_string(),
            reason: "Name cannot be empty or whitespace-only".to_string(),
        });
    }

    if let Some(existing) = state
        .blocks
        .values()
        .find(|b| b.id != block_id && normalize_name(&b.name) == normalized)
    {
        return Err(WorkflowError::DuplicateBlockName {
            name: name.to_string(),
            existing_block_id: existing.id.clone(),
        });
    }

    Ok(())
}

fn ensure_valid_parent(state: &WorkflowState, block_id: &str, parent_id: &str) -> Result<()> {
    let invalid = |reason: &str| WorkflowError::InvalidParent {
        block_id: block_id.to_string(),
        parent_id: parent_id.to_string(),
        reason: reason.to_string(),
    };

    if parent_id == block_id {
        return Err(invalid("a block cannot contain itself"));
    }

    let parent = state
        .block(parent_id)
        .ok_or_else(|| invalid("parent does not exist"))?;

    if !parent.is_container() {
        return Err(invalid("parent is not a loop or parallel block"));
    }

    if state.descendants_of(block_id).iter().any(|d| d == parent_id) {
        return Err(invalid("parent is nested inside the block"));
    }

    Ok(())
}

fn get_unlocked_mut<'a>(state: &'a mut WorkflowState, block_id: &str) -> Result<&'a mut BlockState> {
    let block = state
        .block_mut(block_id)
        .ok_or_else(|| WorkflowError::BlockNotFound {
            block_id: block_id.to_string(),
        })?;

    if block.locked {
        return Err(WorkflowError::BlockLocked {
            block_id: block_id.to_string(),
        });
    }

    Ok(block)
}

/// Add a block to the workflow
///
/// Container descriptors are regenerated when the block is a container or
/// lands inside one.
///
/// # Errors
/// * `InvalidState` - empty block id
/// * `BlockAlreadyExists` - id already in use
/// * `InvalidBlockName` / `DuplicateBlockName` - name rules
/// * `InvalidParent` - `data.parentId` is not an existing container
pub fn add_block(state: &mut WorkflowState, block: BlockState) -> Result<()> {
    if block.id.trim().is_empty() {
        return Err(WorkflowError::InvalidState {
            reason: "Block id cannot be empty".to_string(),
        });
    }

    if state.contains_block(&block.id) {
        return Err(WorkflowError::BlockAlreadyExists {
            block_id: block.id.clone(),
        });
    }

    ensure_name_available(state, &block.id, &block.name)?;

    if let Some(parent_id) = block.parent_id() {
        ensure_valid_parent(state, &block.id, parent_id)?;
    }

    let affects_containers = block.is_container() || block.parent_id().is_some();
    tracing::debug!(block_id = %block.id, block_type = %block.block_type, "adding block");
    state.blocks.insert(block.id.clone(), block);

    if affects_containers {
        regenerate_containers(state);
    }

    Ok(())
}

/// Remove a block, its descendants and every edge touching them
///
/// Returns the removed block ids, the requested block first.
///
/// # Errors
/// * `BlockNotFound` - no such block
/// * `BlockLocked` - the block or one of its descendants is locked
pub fn remove_block(state: &mut WorkflowState, block_id: &str) -> Result<Vec<String>> {
    let block = state.block(block_id).ok_or_else(|| WorkflowError::BlockNotFound {
        block_id: block_id.to_string(),
    })?;

    let affects_containers = block.is_container() || block.parent_id().is_some();

    let mut removed = vec![block_id.to_string()];
    removed.extend(state.descendants_of(block_id));

    if let Some(locked) = removed
        .iter()
        .find(|id| state.block(id).is_some_and(|b| b.locked))
    {
        return Err(WorkflowError::BlockLocked {
            block_id: locked.clone(),
        });
    }

    for id in &removed {
        state.blocks.remove(id);
    }
    state
        .edges
        .retain(|e| !removed.iter().any(|id| e.touches(id)));

    tracing::debug!(block_id, removed = removed.len(), "removed block");

    if affects_containers {
        regenerate_containers(state);
    }

    Ok(removed)
}

/// Rename a block, enforcing normalized-name uniqueness
///
/// # Errors
/// * `BlockNotFound`, `BlockLocked`
/// * `InvalidBlockName` / `DuplicateBlockName`
pub fn rename_block(state: &mut WorkflowState, block_id: &str, name: impl Into<String>) -> Result<()> {
    let name = name.into();
    get_unlocked_mut(state, block_id)?;
    ensure_name_available(state, block_id, &name)?;

    let block = get_unlocked_mut(state, block_id)?;
    block.name = name.trim().to_string();
    Ok(())
}

/// Move a block into a container, or out of any container with `None`
///
/// # Errors
/// * `BlockNotFound`, `BlockLocked`
/// * `InvalidParent` - target is missing, not a container, the block itself,
///   or nested inside the block
pub fn update_parent(
    state: &mut WorkflowState,
    block_id: &str,
    parent_id: Option<String>,
) -> Result<()> {
    get_unlocked_mut(state, block_id)?;
    if let Some(ref parent) = parent_id {
        ensure_valid_parent(state, block_id, parent)?;
    }

    let block = get_unlocked_mut(state, block_id)?;
    if block.parent_id() == parent_id.as_deref() {
        return Ok(());
    }
    block.set_parent_id(parent_id);
    regenerate_containers(state);
    Ok(())
}

/// Enable or disable a block
///
/// # Errors
/// * `BlockNotFound`, `BlockLocked`
pub fn set_block_enabled(state: &mut WorkflowState, block_id: &str, enabled: bool) -> Result<()> {
    get_unlocked_mut(state, block_id)?.enabled = enabled;
    Ok(())
}

/// Lock or unlock a block; containers cascade to all descendants
///
/// Returns the ids whose lock flag was written.
///
/// # Errors
/// * `BlockNotFound`
pub fn set_block_locked(state: &mut WorkflowState, block_id: &str, locked: bool) -> Result<Vec<String>> {
    let block = state.block(block_id).ok_or_else(|| WorkflowError::BlockNotFound {
        block_id: block_id.to_string(),
    })?;

    let mut targets = vec![block_id.to_string()];
    if block.is_container() {
        targets.extend(state.descendants_of(block_id));
    }

    for id in &targets {
        if let Some(b) = state.block_mut(id) {
            b.locked = locked;
        }
    }

    Ok(targets)
}

/// Write one field value on a block
///
/// # Errors
/// * `BlockNotFound`, `BlockLocked`
/// * `InvalidState` - the block has no such field
pub fn set_sub_block_value(
    state: &mut WorkflowState,
    block_id: &str,
    field_id: &str,
    value: Value,
) -> Result<()> {
    let block = get_unlocked_mut(state, block_id)?;
    let sub = block
        .sub_blocks
        .get_mut(field_id)
        .ok_or_else(|| WorkflowError::InvalidState {
            reason: format!("Block {} has no field {}", block_id, field_id),
        })?;
    sub.value = value;
    Ok(())
}
