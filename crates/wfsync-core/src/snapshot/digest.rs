//! Content digests for workflow states.
//!
//! The digest is SHA-256 over canonical JSON: markers stripped, edges sorted
//! by id, maps already ordered by `BTreeMap`. Two states that differ only in
//! diff markers or edge order hash the same.

use sha2::{Digest, Sha256};

use crate::diff::markers::remove_markers;
use crate::errors::Result;
use crate::model::WorkflowState;

/// Canonical JSON of a state
///
/// # Errors
/// Returns `WorkflowError::Serialization` if JSON serialization fails.
pub fn canonical_json(state: &WorkflowState) -> Result<String> {
    let mut canonical = state.clone();
    remove_markers(&mut canonical);
    canonical.edges.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(serde_json::to_string(&canonical)?)
}

/// Hex-encoded SHA-256 digest (64 characters) of the canonical state
///
/// # Errors
/// Returns `WorkflowError::Serialization` if JSON serialization fails.
pub fn state_digest(state: &WorkflowState) -> Result<String> {
    Ok(hash_string(&canonical_json(state)?))
}

fn hash_string(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
