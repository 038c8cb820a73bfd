use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{Result, WorkflowError};
use crate::model::{Edge, WorkflowState};

/// True if both endpoints live directly inside the same loop/parallel
///
/// Edges inside a subflow may close cycles; the container drives iteration.
pub fn is_intra_container(state: &WorkflowState, source: &str, target: &str) -> bool {
    let parent = |id: &str| state.block(id).and_then(|b| b.parent_id().map(str::to_string));
    matches!((parent(source), parent(target)), (Some(a), Some(b)) if a == b)
}

/// True if adding `source -> target` would close a cycle outside a subflow
pub fn would_create_cycle(state: &WorkflowState, source: &str, target: &str) -> bool {
    if is_intra_container(state, source, target) {
        return false;
    }

    let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for edge in &state.edges {
        if !is_intra_container(state, &edge.source, &edge.target) {
            adjacency
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
        }
    }

    // The new edge closes a cycle iff `source` is reachable from `target`
    let mut visited = BTreeSet::new();
    let mut stack = vec![target];
    while let Some(current) = stack.pop() {
        if current == source {
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

/// Add an edge
///
/// Loop and parallel descriptors are left untouched.
///
/// # Errors
/// * `InvalidState` - empty edge id
/// * `EdgeAlreadyExists` - id already in use
/// * `DanglingEdge` - an endpoint does not exist
/// * `SelfEdge` - source equals target
/// * `CycleDetected` - edge would close a cycle outside a subflow
pub fn add_edge(state: &mut WorkflowState, edge: Edge) -> Result<()> {
    if edge.id.trim().is_empty() {
        return Err(WorkflowError::InvalidState {
            reason: "Edge id cannot be empty".to_string(),
        });
    }

    if state.edge(&edge.id).is_some() {
        return Err(WorkflowError::EdgeAlreadyExists { edge_id: edge.id });
    }

    for endpoint in [&edge.source, &edge.target] {
        if !state.contains_block(endpoint) {
            return Err(WorkflowError::DanglingEdge {
                edge_id: edge.id.clone(),
                block_id: endpoint.clone(),
            });
        }
    }

    if edge.source == edge.target {
        return Err(WorkflowError::SelfEdge {
            edge_id: edge.id,
            block_id: edge.source,
        });
    }

    if would_create_cycle(state, &edge.source, &edge.target) {
        return Err(WorkflowError::CycleDetected {
            edge_id: edge.id,
            source_id: edge.source,
            target_id: edge.target,
        });
    }

    tracing::debug!(edge_id = %edge.id, source = %edge.source, target = %edge.target, "adding edge");
    state.edges.push(edge);
    Ok(())
}

/// Remove an edge by id, returning it
///
/// # Errors
/// * `EdgeNotFound` - no such edge
pub fn remove_edge(state: &mut WorkflowState, edge_id: &str) -> Result<Edge> {
    let index = state
        .edges
        .iter()
        .position(|e| e.id == edge_id)
        .ok_or_else(|| WorkflowError::EdgeNotFound {
            edge_id: edge_id.to_string(),
        })?;
    Ok(state.edges.remove(index))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::BlockState;
    use crate::ops::container_ops::regenerate_containers;

    fn chain() -> WorkflowState {
        WorkflowState::new()
            .with_block(BlockState::new("A", "starter", "Start"))
            .with_block(BlockState::new("B", "agent", "Agent"))
            .with_block(BlockState::new("C", "function", "Fn"))
            .with_edge(Edge::new("ab", "A", "B"))
            .with_edge(Edge::new("bc", "B", "C"))
    }

    #[test]
    fn test_add_edge_rejects_cycle() {
        let mut state = chain();
        let err = add_edge(&mut state, Edge::new("ca", "C", "A")).unwrap_err();
        assert!(matches!(err, WorkflowError::CycleDetected { .. }));
        assert_eq!(state.edges.len(), 2);
    }

    #[test]
    fn test_add_edge_allows_cycle_inside_subflow() {
        let mut state = WorkflowState::new()
            .with_block(BlockState::new("L", "loop", "Loop"))
            .with_block(BlockState::new("x", "agent", "X").with_parent("L"))
            .with_block(BlockState::new("y", "agent", "Y").with_parent("L"))
            .with_edge(Edge::new("xy", "x", "y"));

        add_edge(&mut state, Edge::new("yx", "y", "x")).unwrap();
        assert_eq!(state.edges.len(), 2);
    }

    #[test]
    fn test_add_edge_rejects_dangling_and_self() {
        let mut state = chain();
        assert!(matches!(
            add_edge(&mut state, Edge::new("e", "A", "Z")).unwrap_err(),
            WorkflowError::DanglingEdge { ref block_id, .. } if block_id == "Z"
        ));
        assert!(matches!(
            add_edge(&mut state, Edge::new("e", "B", "B")).unwrap_err(),
            WorkflowError::SelfEdge { .. }
        ));
        assert!(matches!(
            add_edge(&mut state, Edge::new("ab", "A", "C")).unwrap_err(),
            WorkflowError::EdgeAlreadyExists { .. }
        ));
    }

    #[test]
    fn test_edge_ops_leave_container_maps_alone() {
        let mut state = chain().with_block(BlockState::new("L", "loop", "Loop"));
        regenerate_containers(&mut state);
        // Stale descriptor must survive pure edge mutations untouched
        state.loops.get_mut("L").unwrap().iterations = 42;

        add_edge(&mut state, Edge::new("cl", "C", "L")).unwrap();
        remove_edge(&mut state, "ab").unwrap();

        assert_eq!(state.loops["L"].iterations, 42);
    }

    #[test]
    fn test_remove_missing_edge() {
        let mut state = chain();
        assert_eq!(
            remove_edge(&mut state, "nope").unwrap_err(),
            WorkflowError::EdgeNotFound { edge_id: "nope".to_string() }
        );
    }
}
