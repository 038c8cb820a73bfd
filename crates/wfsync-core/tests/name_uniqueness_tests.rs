//! Name Uniqueness Tests
//!
//! Block names are unique after normalization (lowercase, whitespace removed)
//! across every operation that can introduce a name.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::two_block_workflow;
use wfsync_core::model::BlockState;
use wfsync_core::ops::normalize_name;
use wfsync_core::rules::validate_and_sanitize;
use wfsync_core::{apply, Command, ExError, ExErrorKind, WorkflowError};

#[test]
fn test_add_block_rejects_case_and_space_variants() {
    // GIVEN a workflow containing "Agent B"
    let state = two_block_workflow();

    for variant in ["agent b", "AGENTB", " Agent\tB "] {
        // WHEN a block with a normalized-equal name is added
        let result = apply(
            state.clone(),
            Command::AddBlock {
                block: BlockState::new("dup", "agent", variant),
            },
        );

        // THEN it is rejected with the clashing block id
        match result {
            Err(WorkflowError::DuplicateBlockName {
                existing_block_id, ..
            }) => assert_eq!(existing_block_id, "B"),
            other => panic!("expected DuplicateBlockName for {:?}, got {:?}", variant, other),
        }
    }
}

#[test]
fn test_rename_to_own_name_variant_is_allowed() {
    let state = two_block_workflow();
    let state = apply(
        state,
        Command::RenameBlock {
            block_id: "B".to_string(),
            name: "agent  b".to_string(),
        },
    )
    .unwrap();
    assert_eq!(state.block("B").unwrap().name, "agent  b");
}

#[test]
fn test_rename_onto_other_block_maps_to_duplicate_name_code() {
    let state = two_block_workflow();
    let err = apply(
        state,
        Command::RenameBlock {
            block_id: "B".to_string(),
            name: "start a".to_string(),
        },
    )
    .unwrap_err();

    let ex: ExError = err.into();
    assert_eq!(ex.kind(), ExErrorKind::DuplicateName);
    assert_eq!(ex.field(), Some("name"));
}

#[test]
fn test_whitespace_only_name_is_invalid() {
    let state = two_block_workflow();
    let err = apply(
        state,
        Command::AddBlock {
            block: BlockState::new("blank", "agent", "  \n "),
        },
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidBlockName { .. }));
}

#[test]
fn test_sanitizer_reports_duplicates_in_raw_state() {
    // Raw states can bypass ops, so the sanitizer must catch clashes
    let state = two_block_workflow().with_block(BlockState::new("C", "agent", "AgentB"));

    let report = validate_and_sanitize(&state);

    assert!(!report.is_valid());
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].block_id.as_deref(), Some("C"));
    assert_eq!(normalize_name("AgentB"), normalize_name("Agent B"));
}
