//! Execution IR serializer.
//!
//! Converts a workflow state into the flat form the executor consumes
//! (blocks with tool config, connections, container descriptors) and back.
//! Diff markers are not part of the IR, so a round trip also strips them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{Result, WorkflowError};
use crate::model::{
    BlockData, BlockState, BlockType, Edge, Loop, LoopType, Parallel, ParallelType, Position,
    SubBlockState, WorkflowState,
};
use crate::rules::invariants;

/// IR version written by [`serialize_workflow`]
pub const SERIALIZED_VERSION: &str = "1.0";

/// Field type assumed when the IR carries a param without an input entry
const DEFAULT_INPUT_TYPE: &str = "short-input";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedWorkflow {
    pub version: String,
    pub blocks: Vec<SerializedBlock>,
    pub connections: Vec<SerializedConnection>,
    #[serde(default)]
    pub loops: BTreeMap<String, Loop>,
    #[serde(default)]
    pub parallels: BTreeMap<String, Parallel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedBlock {
    pub id: String,
    pub position: Position,
    pub config: BlockConfig,
    /// Field id to field type
    pub inputs: BTreeMap<String, String>,
    pub outputs: BTreeMap<String, Value>,
    pub metadata: SerializedBlockMetadata,
    pub enabled: bool,
    #[serde(default)]
    pub advanced_mode: bool,
    #[serde(default)]
    pub trigger_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockConfig {
    pub tool: String,
    /// Field id to value
    pub params: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedBlockMetadata {
    /// Block type
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedConnection {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

fn malformed(container_id: &str, reason: impl Into<String>) -> WorkflowError {
    WorkflowError::MalformedContainer {
        container_id: container_id.to_string(),
        reason: reason.into(),
    }
}

fn is_collection_shape(value: &Value) -> bool {
    value.is_array() || value.is_object() || value.is_string()
}

fn check_members(state: &WorkflowState, container_id: &str, nodes: &[String]) -> Result<()> {
    match nodes.iter().find(|n| !state.contains_block(n)) {
        Some(unknown) => Err(malformed(container_id, format!("unknown member '{}'", unknown))),
        None => Ok(()),
    }
}

fn validate_loops(state: &WorkflowState) -> Result<()> {
    for (key, descriptor) in &state.loops {
        if key != &descriptor.id {
            return Err(malformed(key, format!("descriptor id '{}' does not match key", descriptor.id)));
        }
        match state.block(key) {
            None => return Err(malformed(key, "container block does not exist")),
            Some(b) if b.block_type != BlockType::Loop => {
                return Err(malformed(key, format!("block is a '{}', not a loop", b.block_type)))
            }
            Some(_) => {}
        }
        check_members(state, key, &descriptor.nodes)?;
        if descriptor.loop_type == LoopType::For && descriptor.iterations == 0 {
            return Err(malformed(key, "for loop needs at least one iteration"));
        }
        if let Some(items) = &descriptor.for_each_items {
            if !is_collection_shape(items) {
                return Err(malformed(key, "forEach items must be an array, object or string"));
            }
        }
    }
    Ok(())
}

fn validate_parallels(state: &WorkflowState) -> Result<()> {
    for (key, descriptor) in &state.parallels {
        if key != &descriptor.id {
            return Err(malformed(key, format!("descriptor id '{}' does not match key", descriptor.id)));
        }
        match state.block(key) {
            None => return Err(malformed(key, "container block does not exist")),
            Some(b) if b.block_type != BlockType::Parallel => {
                return Err(malformed(key, format!("block is a '{}', not a parallel", b.block_type)))
            }
            Some(_) => {}
        }
        check_members(state, key, &descriptor.nodes)?;
        if descriptor.parallel_type == ParallelType::Count && descriptor.count == Some(0) {
            return Err(malformed(key, "count parallel needs a positive count"));
        }
        if let Some(distribution) = &descriptor.distribution {
            if !is_collection_shape(distribution) {
                return Err(malformed(key, "distribution must be an array, object or string"));
            }
        }
    }
    Ok(())
}

/// Serialize a state into execution IR
///
/// # Errors
/// * `InvalidState` - block key/id disagreement
/// * `DanglingEdge` / `SelfEdge` - unusable connections
/// * `MalformedContainer` - loop or parallel descriptor does not match the blocks
pub fn serialize_workflow(state: &WorkflowState) -> Result<SerializedWorkflow> {
    if let Some((key, id)) = invariants::find_key_id_mismatches(state).into_iter().next() {
        return Err(WorkflowError::InvalidState {
            reason: format!("Block key '{}' does not match block id '{}'", key, id),
        });
    }
    if let Some((edge_id, block_id)) = invariants::find_dangling_edges(state).into_iter().next() {
        return Err(WorkflowError::DanglingEdge { edge_id, block_id });
    }
    if let Some((edge_id, block_id)) = invariants::find_self_edges(state).into_iter().next() {
        return Err(WorkflowError::SelfEdge { edge_id, block_id });
    }
    validate_loops(state)?;
    validate_parallels(state)?;

    let blocks = state
        .blocks
        .values()
        .map(|block| SerializedBlock {
            id: block.id.clone(),
            position: block.position,
            config: BlockConfig {
                tool: block.block_type.to_string(),
                params: block
                    .sub_blocks
                    .iter()
                    .map(|(id, sub)| (id.clone(), sub.value.clone()))
                    .collect(),
            },
            inputs: block
                .sub_blocks
                .iter()
                .map(|(id, sub)| (id.clone(), sub.sub_block_type.clone()))
                .collect(),
            outputs: block.outputs.clone(),
            metadata: SerializedBlockMetadata {
                id: block.block_type.to_string(),
                name: block.name.clone(),
                parent_id: block.parent_id().map(str::to_string),
            },
            enabled: block.enabled,
            advanced_mode: block.advanced_mode,
            trigger_mode: block.trigger_mode,
        })
        .collect();

    let connections = state
        .edges
        .iter()
        .map(|edge| SerializedConnection {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            source_handle: edge.source_handle.clone(),
            target_handle: edge.target_handle.clone(),
        })
        .collect();

    Ok(SerializedWorkflow {
        version: SERIALIZED_VERSION.to_string(),
        blocks,
        connections,
        loops: state.loops.clone(),
        parallels: state.parallels.clone(),
    })
}

fn container_data(serialized: &SerializedWorkflow, block_id: &str) -> Option<BlockData> {
    if let Some(descriptor) = serialized.loops.get(block_id) {
        return Some(BlockData {
            count: Some(descriptor.iterations),
            loop_type: Some(descriptor.loop_type),
            collection: descriptor.for_each_items.clone(),
            while_condition: descriptor.while_condition.clone(),
            ..BlockData::default()
        });
    }
    serialized.parallels.get(block_id).map(|descriptor| BlockData {
        count: descriptor.count,
        parallel_type: Some(descriptor.parallel_type),
        collection: descriptor.distribution.clone(),
        ..BlockData::default()
    })
}

/// Rebuild a workflow state from execution IR
///
/// # Errors
/// * `InvalidState` - empty block id
/// * `BlockAlreadyExists` / `EdgeAlreadyExists` - duplicate ids
pub fn deserialize_workflow(serialized: &SerializedWorkflow) -> Result<WorkflowState> {
    let mut state = WorkflowState::new();

    for sb in &serialized.blocks {
        if sb.id.trim().is_empty() {
            return Err(WorkflowError::InvalidState {
                reason: "Serialized block has an empty id".to_string(),
            });
        }
        if state.contains_block(&sb.id) {
            return Err(WorkflowError::BlockAlreadyExists {
                block_id: sb.id.clone(),
            });
        }

        let mut block = BlockState::new(sb.id.clone(), sb.metadata.id.as_str(), sb.metadata.name.clone());
        block.position = sb.position;
        block.outputs = sb.outputs.clone();
        block.enabled = sb.enabled;
        block.advanced_mode = sb.advanced_mode;
        block.trigger_mode = sb.trigger_mode;
        block.sub_blocks = sb
            .config
            .params
            .iter()
            .map(|(id, value)| {
                let field_type = sb
                    .inputs
                    .get(id)
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_INPUT_TYPE);
                (id.clone(), SubBlockState::new(id.clone(), field_type, value.clone()))
            })
            .collect();
        block.data = container_data(serialized, &sb.id);
        block.set_parent_id(sb.metadata.parent_id.clone());

        state.blocks.insert(block.id.clone(), block);
    }

    let mut seen = BTreeSet::new();
    for conn in &serialized.connections {
        if !seen.insert(conn.id.as_str()) {
            return Err(WorkflowError::EdgeAlreadyExists {
                edge_id: conn.id.clone(),
            });
        }
        state.edges.push(Edge {
            id: conn.id.clone(),
            source: conn.source.clone(),
            target: conn.target.clone(),
            source_handle: conn.source_handle.clone(),
            target_handle: conn.target_handle.clone(),
            edge_type: None,
        });
    }

    state.loops = serialized.loops.clone();
    state.parallels = serialized.parallels.clone();
    Ok(state)
}

fn id_sets(state: &WorkflowState) -> [(&'static str, BTreeSet<String>); 4] {
    [
        ("block", state.blocks.keys().cloned().collect()),
        ("edge", state.edges.iter().map(|e| e.id.clone()).collect()),
        ("loop", state.loops.keys().cloned().collect()),
        ("parallel", state.parallels.keys().cloned().collect()),
    ]
}

/// Serialize, encode as JSON, parse and deserialize, then compare shapes
///
/// # Errors
/// * Any error from [`serialize_workflow`] or [`deserialize_workflow`]
/// * `Serialization` - JSON encoding or parsing failed
/// * `RoundTripMismatch` - block, edge or container ids changed
pub fn round_trip_check(state: &WorkflowState) -> Result<()> {
    let serialized = serialize_workflow(state)?;
    let encoded = serde_json::to_value(&serialized)?;
    let parsed: SerializedWorkflow = serde_json::from_value(encoded)?;
    let restored = deserialize_workflow(&parsed)?;

    for ((kind, before), (_, after)) in id_sets(state).into_iter().zip(id_sets(&restored)) {
        if before != after {
            return Err(WorkflowError::RoundTripMismatch {
                reason: format!(
                    "{} ids changed: lost {:?}, gained {:?}",
                    kind,
                    before.difference(&after).collect::<Vec<_>>(),
                    after.difference(&before).collect::<Vec<_>>()
                ),
            });
        }
    }

    Ok(())
}
