use std::collections::{BTreeMap, BTreeSet};

use crate::model::WorkflowState;
use crate::ops::edge_ops::is_intra_container;
use crate::ops::normalize_name;

/// Blocks whose map key disagrees with their embedded id, or whose id is empty
///
/// Returns list of (key, id) tuples
pub fn find_key_id_mismatches(state: &WorkflowState) -> Vec<(String, String)> {
    state
        .blocks
        .iter()
        .filter(|(key, block)| block.id.trim().is_empty() || *key != &block.id)
        .map(|(key, block)| (key.clone(), block.id.clone()))
        .collect()
}

/// Edges with an empty id
pub fn find_empty_edge_ids(state: &WorkflowState) -> Vec<(String, String)> {
    state
        .edges
        .iter()
        .filter(|e| e.id.trim().is_empty())
        .map(|e| (e.source.clone(), e.target.clone()))
        .collect()
}

/// Edges pointing at missing blocks
///
/// Returns list of (edge_id, missing_block_id) tuples
pub fn find_dangling_edges(state: &WorkflowState) -> Vec<(String, String)> {
    let mut dangling = Vec::new();
    for edge in &state.edges {
        for endpoint in [&edge.source, &edge.target] {
            if !state.contains_block(endpoint) {
                dangling.push((edge.id.clone(), endpoint.clone()));
            }
        }
    }
    dangling
}

/// Edges whose source and target are the same block
///
/// Returns list of (edge_id, block_id) tuples
pub fn find_self_edges(state: &WorkflowState) -> Vec<(String, String)> {
    state
        .edges
        .iter()
        .filter(|e| e.source == e.target)
        .map(|e| (e.id.clone(), e.source.clone()))
        .collect()
}

/// Edge ids used more than once
pub fn find_duplicate_edge_ids(state: &WorkflowState) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for edge in &state.edges {
        if !seen.insert(edge.id.as_str()) {
            duplicates.insert(edge.id.clone());
        }
    }
    duplicates.into_iter().collect()
}

/// Blocks whose `parentId` is missing or not a loop/parallel
///
/// Returns list of (block_id, parent_id, reason) tuples
pub fn find_invalid_parents(state: &WorkflowState) -> Vec<(String, String, String)> {
    let mut invalid = Vec::new();
    for block in state.blocks.values() {
        let Some(parent_id) = block.parent_id() else {
            continue;
        };
        let reason = match state.block(parent_id) {
            None => "parent does not exist",
            Some(parent) if !parent.is_container() => "parent is not a loop or parallel block",
            Some(_) => continue,
        };
        invalid.push((block.id.clone(), parent_id.to_string(), reason.to_string()));
    }
    invalid
}

/// Blocks that sit on a `parentId` cycle
pub fn find_parent_cycles(state: &WorkflowState) -> Vec<String> {
    let mut on_cycle = Vec::new();
    for start in state.blocks.keys() {
        let mut visited = BTreeSet::new();
        let mut current = Some(start.as_str());
        while let Some(id) = current {
            if !visited.insert(id) {
                if id == start {
                    on_cycle.push(start.clone());
                }
                break;
            }
            current = state.block(id).and_then(|b| b.parent_id());
        }
    }
    on_cycle
}

/// Edges that sit on a cycle outside a loop/parallel subflow
///
/// Edges between two children of the same container are ignored, so a cycle
/// made only of those is allowed. Returns list of (edge_id, source, target)
/// tuples in edge order.
pub fn find_edge_cycles(state: &WorkflowState) -> Vec<(String, String, String)> {
    let outer: Vec<_> = state
        .edges
        .iter()
        .filter(|e| !is_intra_container(state, &e.source, &e.target))
        .collect();

    let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for edge in &outer {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    // source -> target is on a cycle iff source is reachable from target
    outer
        .iter()
        .filter(|e| e.source != e.target && reaches(&adjacency, &e.target, &e.source))
        .map(|e| (e.id.clone(), e.source.clone(), e.target.clone()))
        .collect()
}

fn reaches(adjacency: &BTreeMap<&str, Vec<&str>>, from: &str, goal: &str) -> bool {
    let mut visited = BTreeSet::new();
    let mut stack = vec![from];
    while let Some(current) = stack.pop() {
        if current == goal {
            return true;
        }
        if visited.insert(current) {
            if let Some(next) = adjacency.get(current) {
                stack.extend(next.iter().copied());
            }
        }
    }
    false
}

/// Blocks whose name is empty after normalization
pub fn find_empty_names(state: &WorkflowState) -> Vec<String> {
    state
        .blocks
        .values()
        .filter(|b| normalize_name(&b.name).is_empty())
        .map(|b| b.id.clone())
        .collect()
}

/// Blocks whose normalized name was already taken by a block earlier in id order
///
/// Returns list of (block_id, name, first_block_id) tuples
pub fn find_duplicate_names(state: &WorkflowState) -> Vec<(String, String, String)> {
    let mut first_by_name: BTreeMap<String, &str> = BTreeMap::new();
    let mut duplicates = Vec::new();
    for block in state.blocks.values() {
        let normalized = normalize_name(&block.name);
        if normalized.is_empty() {
            continue;
        }
        match first_by_name.get(&normalized) {
            Some(first) => {
                duplicates.push((block.id.clone(), block.name.clone(), first.to_string()))
            }
            None => {
                first_by_name.insert(normalized, &block.id);
            }
        }
    }
    duplicates
}
