use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::block::BlockState;
use super::edge::Edge;

/// Iteration strategy of a loop container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoopType {
    #[default]
    For,
    ForEach,
    While,
    DoWhile,
}

/// Fan-out strategy of a parallel container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParallelType {
    #[default]
    Count,
    Collection,
}

/// Materialized loop descriptor, derived from the loop block and its children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loop {
    pub id: String,
    pub nodes: Vec<String>,
    pub iterations: u32,
    pub loop_type: LoopType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_each_items: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub while_condition: Option<String>,
}

/// Materialized parallel descriptor, derived from the parallel block and its children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parallel {
    pub id: String,
    pub nodes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Value>,
    pub parallel_type: ParallelType,
}

/// Descriptive workflow metadata, never diffed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The unit of diffing and persistence
///
/// `loops` and `parallels` are derived from block topology; see
/// `ops::container_ops` for when they are regenerated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowState {
    #[serde(default)]
    pub blocks: BTreeMap<String, BlockState>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub loops: BTreeMap<String, Loop>,
    #[serde(default)]
    pub parallels: BTreeMap<String, Parallel>,
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<WorkflowMetadata>,
}

impl WorkflowState {
    /// Create an empty workflow
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: insert a block keyed by its id (no validation, no regeneration)
    pub fn with_block(mut self, block: BlockState) -> Self {
        self.blocks.insert(block.id.clone(), block);
        self
    }

    /// Builder: append an edge (no validation)
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn block(&self, id: &str) -> Option<&BlockState> {
        self.blocks.get(id)
    }

    pub fn block_mut(&mut self, id: &str) -> Option<&mut BlockState> {
        self.blocks.get_mut(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn contains_block(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    /// Direct children of a container, in id order
    pub fn children_of(&self, container_id: &str) -> Vec<String> {
        self.blocks
            .values()
            .filter(|b| b.parent_id() == Some(container_id))
            .map(|b| b.id.clone())
            .collect()
    }

    /// All transitive children of a container, breadth-first
    pub fn descendants_of(&self, container_id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut frontier = vec![container_id.to_string()];
        while let Some(current) = frontier.pop() {
            for child in self.children_of(&current) {
                // Guards against parent cycles in unvalidated input
                if child != container_id && !out.contains(&child) {
                    frontier.push(child.clone());
                    out.push(child);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descendants_cover_nested_containers() {
        let state = WorkflowState::new()
            .with_block(BlockState::new("outer", "loop", "Outer"))
            .with_block(BlockState::new("inner", "parallel", "Inner").with_parent("outer"))
            .with_block(BlockState::new("leaf", "agent", "Leaf").with_parent("inner"))
            .with_block(BlockState::new("free", "agent", "Free"));

        let mut descendants = state.descendants_of("outer");
        descendants.sort();
        assert_eq!(descendants, vec!["inner".to_string(), "leaf".to_string()]);
        assert_eq!(state.children_of("outer"), vec!["inner".to_string()]);
    }

    #[test]
    fn test_loop_type_wire_names() {
        assert_eq!(serde_json::to_value(LoopType::ForEach).unwrap(), json!("forEach"));
        assert_eq!(serde_json::to_value(LoopType::DoWhile).unwrap(), json!("doWhile"));
        assert_eq!(
            serde_json::to_value(ParallelType::Collection).unwrap(),
            json!("collection")
        );
    }

    #[test]
    fn test_minimal_state_deserializes() {
        let state: WorkflowState = serde_json::from_value(json!({
            "blocks": {"A": {"id": "A", "type": "starter", "name": "Start"}},
            "edges": []
        }))
        .unwrap();
        assert!(state.contains_block("A"));
        assert!(state.loops.is_empty());
    }
}
