//! Diff Store lifecycle tests
//!
//! Propose, toggle, accept and reject against recording collaborators.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{agent, single_block_workflow, two_block_workflow, Harness, WORKFLOW_ID};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wfsync_core::diff::{has_markers, without_markers};
use wfsync_core::errors::ExErrorKind;
use wfsync_core::model::{DiffStatus, Edge};
use wfsync_engine::{DiffEventKind, DiffPhase, ProposalOutcome};

#[tokio::test]
async fn test_new_block_with_edge_is_applied_with_markers() {
    // GIVEN a workflow with a single block A
    let mut h = Harness::new(single_block_workflow());

    // WHEN the proposal adds B wired from A
    let outcome = assert_ok!(h.store.set_proposed_changes(two_block_workflow(), None).await);

    // THEN B is new, the edge is new, and the live state shows the markers
    let ProposalOutcome::Applied { analysis, .. } = outcome else {
        panic!("expected the proposal to be applied");
    };
    assert_eq!(analysis.new_blocks, vec!["B"]);
    assert!(analysis.edited_blocks.is_empty());
    assert_eq!(analysis.edge_diff.new_edges, vec!["e-ab"]);

    let live = h.live();
    assert_eq!(live.block("B").unwrap().is_diff, Some(DiffStatus::New));
    assert!(live.block("A").unwrap().is_diff.is_none());
    assert_eq!(h.store.phase(), DiffPhase::ActiveShowing);
    assert_eq!(h.store.baseline(), Some(&single_block_workflow()));
}

#[tokio::test]
async fn test_single_field_edit_marks_only_that_field() {
    let mut h = Harness::new(two_block_workflow());
    let mut proposed = two_block_workflow();
    proposed.blocks.insert("B".to_string(), agent("B", "Translate the input"));

    assert_ok!(h.store.set_proposed_changes(proposed, None).await);

    let analysis = h.store.diff_analysis().unwrap();
    assert_eq!(analysis.edited_blocks, vec!["B"]);
    assert_eq!(analysis.field_diffs["B"].changed_fields, vec!["prompt"]);

    let live = h.live();
    let b = live.block("B").unwrap();
    assert_eq!(b.is_diff, Some(DiffStatus::Edited));
    assert_eq!(b.sub_blocks["prompt"].is_diff, Some(DiffStatus::Edited));
    assert!(b.sub_blocks["model"].is_diff.is_none());
    assert_eq!(b.sub_blocks["prompt"].value, json!("Translate the input"));
}

#[tokio::test]
async fn test_empty_diff_never_enters_diff_mode() {
    // GIVEN an idle store
    let mut h = Harness::new(two_block_workflow());

    // WHEN the proposal equals the live state
    let outcome = assert_ok!(h.store.set_proposed_changes(two_block_workflow(), None).await);
    h.store.wait_for_background().await;

    // THEN nothing happens anywhere
    assert_eq!(outcome, ProposalOutcome::NoChanges);
    assert_eq!(h.store.phase(), DiffPhase::Idle);
    assert!(h.store.baseline().is_none());
    assert!(h.undo.events.lock().unwrap().is_empty());
    assert!(h.broadcast.sent.lock().unwrap().is_empty());
    assert_eq!(h.live(), two_block_workflow());
}

#[tokio::test]
async fn test_empty_diff_on_open_session_reverts_everywhere() {
    // GIVEN an open session whose candidate was already synced
    let mut h = Harness::new(single_block_workflow());
    assert_ok!(h.store.set_proposed_changes(two_block_workflow(), None).await);
    h.store.wait_for_background().await;

    // WHEN a follow-up proposal matches the baseline
    let outcome = assert_ok!(h.store.set_proposed_changes(single_block_workflow(), None).await);
    h.store.wait_for_background().await;

    // THEN the session ends with the baseline live
    assert_eq!(outcome, ProposalOutcome::NoChanges);
    assert_eq!(h.store.phase(), DiffPhase::Idle);
    assert_eq!(h.live(), single_block_workflow());

    // AND the backend and collaborators got the baseline back
    let saved = h.persistence.saved.lock().unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[1].1, single_block_workflow());
    let sent = h.broadcast.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].state, single_block_workflow());

    // AND the revert is undoable like a reject
    let kinds: Vec<_> = h.undo.events.lock().unwrap().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![DiffEventKind::ApplyDiff, DiffEventKind::RejectDiff]);
}

#[tokio::test]
async fn test_baseline_is_reused_across_proposals() {
    // GIVEN a first proposal P1 that adds C
    let mut h = Harness::new(two_block_workflow());
    let p1 = two_block_workflow()
        .with_block(agent("C", "Review"))
        .with_edge(Edge::new("e-bc", "B", "C"));
    assert_ok!(h.store.set_proposed_changes(p1, None).await);

    // WHEN a second proposal P2 only edits B
    let mut p2 = two_block_workflow();
    p2.blocks.insert("B".to_string(), agent("B", "Translate the input"));
    assert_ok!(h.store.set_proposed_changes(p2, None).await);

    // THEN P2 is diffed against the original baseline, not against P1
    assert_eq!(h.store.baseline(), Some(&two_block_workflow()));
    let analysis = h.store.diff_analysis().unwrap();
    assert!(analysis.new_blocks.is_empty());
    assert!(analysis.deleted_blocks.is_empty());
    assert_eq!(analysis.edited_blocks, vec!["B"]);
    assert!(!h.live().contains_block("C"));

    let events = h.undo.events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.kind == DiffEventKind::ApplyDiff));
    assert_eq!(events[1].baseline.as_ref(), Some(&two_block_workflow()));
}

#[tokio::test]
async fn test_toggle_only_flips_a_ready_diff() {
    let mut h = Harness::new(single_block_workflow());
    assert!(!h.store.toggle_diff_view());
    assert_eq!(h.store.phase(), DiffPhase::Idle);

    assert_ok!(h.store.set_proposed_changes(two_block_workflow(), None).await);

    assert!(!h.store.toggle_diff_view());
    assert_eq!(h.store.phase(), DiffPhase::ActiveHidden);
    assert!(h.store.toggle_diff_view());
    assert_eq!(h.store.phase(), DiffPhase::ActiveShowing);
}

#[tokio::test]
async fn test_accept_commits_clean_state() {
    // GIVEN an applied proposal
    let mut h = Harness::new(single_block_workflow());
    assert_ok!(h.store.set_proposed_changes(two_block_workflow(), None).await);

    // WHEN accepted
    assert_ok!(h.store.accept_changes());
    h.store.wait_for_background().await;

    // THEN the proposal is the live state, marker-free, and the session is gone
    let live = h.live();
    assert_eq!(live, two_block_workflow());
    assert!(!has_markers(&live));
    assert_eq!(h.store.phase(), DiffPhase::Idle);
    assert!(h.store.baseline().is_none());

    let events = h.undo.events.lock().unwrap();
    let accept = events.last().unwrap();
    assert_eq!(accept.kind, DiffEventKind::AcceptDiff);
    assert_eq!(accept.before, single_block_workflow());
    assert_eq!(accept.after, two_block_workflow());

    let saved = h.persistence.saved.lock().unwrap();
    assert_eq!(saved.last().unwrap(), &(WORKFLOW_ID.to_string(), two_block_workflow()));
}

#[tokio::test]
async fn test_accept_without_diff_fails() {
    let mut h = Harness::new(two_block_workflow());

    let err = assert_err!(h.store.accept_changes());

    assert_eq!(err.kind(), ExErrorKind::NoActiveDiff);
}

#[tokio::test]
async fn test_accept_with_invalid_field_keeps_session_open() {
    // GIVEN an applied proposal whose switch field was then edited to a string
    let mut h = Harness::new(single_block_workflow());
    let proposed = single_block_workflow()
        .with_block(agent("B", "x").with_sub_block("stream", "switch", json!(false)));
    assert_ok!(h.store.set_proposed_changes(proposed, None).await);
    {
        let workspace = h.store.workspace();
        let mut ws = workspace.lock().unwrap();
        assert!(ws.set_sub_block_value("B", "stream", json!("yes")));
    }
    let before = h.live();

    // WHEN accepted
    let err = assert_err!(h.store.accept_changes());

    // THEN nothing is committed and the error is visible
    assert_eq!(err.kind(), ExErrorKind::ValidationFailed);
    assert_eq!(h.store.phase(), DiffPhase::ActiveShowing);
    assert_eq!(h.live(), before);
    assert!(h.store.diff_error().unwrap().contains("ERR_VALIDATION_FAILED"));
}

#[tokio::test]
async fn test_proposal_with_duplicate_names_is_rejected_up_front() {
    // GIVEN a proposal adding a block whose name normalizes onto B's
    let mut h = Harness::new(two_block_workflow());
    let mut twin = agent("C", "Review");
    twin.name = "agent b".to_string();
    let proposed = two_block_workflow().with_block(twin);

    // WHEN proposed
    let err = assert_err!(h.store.set_proposed_changes(proposed, None).await);

    // THEN no session opens and the live state is untouched
    assert_eq!(err.kind(), ExErrorKind::ValidationFailed);
    assert!(err.details().iter().any(|d| d.starts_with("C.name")), "got: {:?}", err.details());
    assert_eq!(h.store.phase(), DiffPhase::Idle);
    assert_eq!(h.live(), two_block_workflow());
    assert!(h.undo.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_reject_restores_baseline() {
    // GIVEN an applied proposal
    let mut h = Harness::new(two_block_workflow());
    let mut proposed = two_block_workflow().with_block(agent("C", "Review"));
    proposed.blocks.remove("A");
    proposed.edges.clear();
    assert_ok!(h.store.set_proposed_changes(proposed, None).await);
    let candidate = h.live();

    // WHEN rejected
    assert_ok!(h.store.reject_changes());
    h.store.wait_for_background().await;

    // THEN the baseline is live again and collaborators receive it
    assert_eq!(h.live(), two_block_workflow());
    assert_eq!(h.store.phase(), DiffPhase::Idle);

    let events = h.undo.events.lock().unwrap();
    let reject = events.last().unwrap();
    assert_eq!(reject.kind, DiffEventKind::RejectDiff);
    assert_eq!(reject.before, candidate);
    assert!(has_markers(&reject.before));
    assert_eq!(reject.after, two_block_workflow());

    let sent = h.broadcast.sent.lock().unwrap();
    assert_eq!(sent.last().unwrap().state, two_block_workflow());
}

#[tokio::test]
async fn test_reject_without_baseline_only_clears() {
    let mut h = Harness::new(two_block_workflow());

    assert_ok!(h.store.reject_changes());
    h.store.wait_for_background().await;

    assert_eq!(h.store.phase(), DiffPhase::Idle);
    assert_eq!(h.live(), two_block_workflow());
    assert!(h.undo.events.lock().unwrap().is_empty());
    assert!(h.persistence.saved.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_background_sync_never_carries_markers() {
    let mut h = Harness::new(single_block_workflow());
    assert_ok!(h.store.set_proposed_changes(two_block_workflow(), None).await);
    assert_ok!(h.store.accept_changes());
    h.store.wait_for_background().await;

    let sent = h.broadcast.sent.lock().unwrap();
    let saved = h.persistence.saved.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(saved.len(), 2);
    assert!(sent.iter().all(|op| !has_markers(&op.state) && op.immediate));
    assert!(saved.iter().all(|(_, state)| !has_markers(state)));
    assert_eq!(sent[0].state, without_markers(&sent[0].state));
}
