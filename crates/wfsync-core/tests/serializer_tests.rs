//! Serializer Round-Trip Tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{loop_workflow, two_block_workflow};
use wfsync_core::diff::create_diff;
use wfsync_core::model::{Edge, WorkflowState};
use wfsync_core::snapshot::{deserialize_workflow, round_trip_check, serialize_workflow};
use wfsync_core::WorkflowError;

#[test]
fn test_round_trip_accepts_valid_states() {
    assert!(round_trip_check(&two_block_workflow()).is_ok());
    assert!(round_trip_check(&loop_workflow()).is_ok());
    assert!(round_trip_check(&WorkflowState::new()).is_ok());
}

#[test]
fn test_round_trip_accepts_marked_candidate() {
    // GIVEN a candidate state carrying diff markers
    let diff = create_diff(&loop_workflow(), None, Some(&two_block_workflow()), "copilot")
        .into_result()
        .unwrap();

    // THEN the round trip accepts it and the IR drops the markers
    assert!(round_trip_check(&diff.proposed_state).is_ok());
    let restored =
        deserialize_workflow(&serialize_workflow(&diff.proposed_state).unwrap()).unwrap();
    assert!(restored.blocks.values().all(|b| !b.has_markers()));
}

#[test]
fn test_round_trip_rejects_dangling_edge() {
    let state = two_block_workflow().with_edge(Edge::new("e-bad", "B", "Z"));

    let err = round_trip_check(&state).unwrap_err();

    assert_eq!(
        err,
        WorkflowError::DanglingEdge {
            edge_id: "e-bad".to_string(),
            block_id: "Z".to_string()
        }
    );
}

#[test]
fn test_round_trip_rejects_unknown_loop_member() {
    let mut state = loop_workflow();
    state.loops.get_mut("L").unwrap().nodes.push("ghost".to_string());

    let err = round_trip_check(&state).unwrap_err();
    assert!(matches!(err, WorkflowError::MalformedContainer { .. }));
}

#[test]
fn test_ir_preserves_handles_and_fields() {
    let state = two_block_workflow().with_edge(Edge::new("e-cond", "A", "B").from_handle("condition-true"));
    let ir = serialize_workflow(&state).unwrap();
    let json = serde_json::to_string(&ir).unwrap();
    let restored = deserialize_workflow(&serde_json::from_str(&json).unwrap()).unwrap();

    assert_eq!(
        restored.edge("e-cond").unwrap().source_handle.as_deref(),
        Some("condition-true")
    );
    assert_eq!(
        restored.block("B").unwrap().sub_block_value("prompt"),
        state.block("B").unwrap().sub_block_value("prompt")
    );
}
