//! Workflow diff engine.
//!
//! Compares a baseline workflow with a proposed one and produces a
//! deterministic [`DiffAnalysis`] plus a candidate state carrying diff
//! markers for review.
//!
//! ## Entry point
//!
//! ```
//! use wfsync_core::diff::{create_diff, render_human_summary};
//! use wfsync_core::model::{BlockState, WorkflowState};
//!
//! let baseline = WorkflowState::new().with_block(BlockState::new("a", "starter", "Start"));
//! let proposed = baseline.clone().with_block(BlockState::new("b", "agent", "Agent"));
//!
//! let diff = create_diff(&proposed, None, Some(&baseline), "copilot").into_result()?;
//! assert_eq!(diff.diff_analysis.new_blocks, vec!["b".to_string()]);
//! println!("{}", render_human_summary(&diff.diff_analysis, Some(&diff.proposed_state)));
//! # Ok::<(), wfsync_core::ExError>(())
//! ```
//!
//! ## Guarantees
//!
//! - **Determinism**: identical inputs give identical analysis and candidate
//!   state; only `DiffMetadata::created_at` varies.
//! - **Layout noise suppression**: position and height never count as edits.
//! - **No panics**: malformed input yields `DiffResult { success: false, .. }`.

pub mod engine;
pub mod human_summary;
pub mod markers;
pub mod model;

pub use engine::{compute_analysis, create_diff};
pub use human_summary::render_human_summary;
pub use markers::{apply_markers, has_markers, remove_markers, without_markers};
pub use model::{DiffAnalysis, DiffMetadata, DiffResult, EdgeDiff, WorkflowDiff};
