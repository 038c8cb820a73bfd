pub mod diff;
pub mod validate;

use anyhow::Context;
use std::path::Path;
use wfsync_core::WorkflowState;

/// Read a workflow JSON file
pub fn read_state(path: &Path) -> anyhow::Result<WorkflowState> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("{} is not a workflow state", path.display()))
}
