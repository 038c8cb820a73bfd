//! wfsync core - workflow model, edits and diffing
//!
//! This crate provides the synchronous building blocks of the workflow
//! reconciliation engine:
//! - Workflow, block and edge models with their JSON wire format
//! - The workflow and field-value stores plus an explicit `Workspace`
//! - Block, edge and container operations behind a functional `apply()`
//! - The diff engine, diff markers and human-readable summaries
//! - Execution IR serialization, round-trip checks and lenient sanitizing
//! - The `ExError` facility and the canonical logging macros
//!
//! Nothing here performs I/O; orchestration lives in `wfsync-engine`.

pub mod apply;
pub mod commands;
pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod rules;
pub mod snapshot;

// Used by the exported logging macros
pub use wfsync_core_types;

// Re-export commonly used types
pub use apply::apply;
pub use commands::Command;
pub use diff::{create_diff, DiffAnalysis, DiffResult, WorkflowDiff};
pub use errors::{ExError, ExErrorKind, Result, WorkflowError};
pub use model::{BlockState, Edge, WorkflowState};
pub use ops::{ReplaceOptions, SubBlockStore, WorkflowStore, Workspace};
