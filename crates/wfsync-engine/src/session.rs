//! Diff session state owned by the [`DiffStore`](crate::DiffStore)

use wfsync_core::diff::{DiffAnalysis, DiffMetadata};
use wfsync_core::WorkflowState;

/// Lifecycle phase, derived from the session flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffPhase {
    /// No diff open
    Idle,
    /// A proposal is being computed on top of an open session
    Computing,
    /// Diff open, candidate state visible
    ActiveShowing,
    /// Diff open, view toggled back to the baseline
    ActiveHidden,
}

/// Mutable state of one review session
///
/// The baseline is captured once, on the first proposal for a workflow, and
/// stays untouched until the session ends.
#[derive(Debug, Clone, Default)]
pub struct DiffSession {
    pub has_active_diff: bool,
    pub is_showing_diff: bool,
    pub is_diff_ready: bool,
    pub baseline: Option<WorkflowState>,
    pub baseline_workflow_id: Option<String>,
    pub diff_analysis: Option<DiffAnalysis>,
    pub diff_metadata: Option<DiffMetadata>,
    pub diff_error: Option<String>,
    pub trigger_message_id: Option<String>,
}

impl DiffSession {
    pub fn phase(&self) -> DiffPhase {
        match (self.has_active_diff, self.is_diff_ready, self.is_showing_diff) {
            (false, _, _) => DiffPhase::Idle,
            (true, false, _) => DiffPhase::Computing,
            (true, true, true) => DiffPhase::ActiveShowing,
            (true, true, false) => DiffPhase::ActiveHidden,
        }
    }

    /// True when the captured baseline belongs to `workflow_id`
    pub fn owns_baseline_for(&self, workflow_id: &str) -> bool {
        self.baseline.is_some() && self.baseline_workflow_id.as_deref() == Some(workflow_id)
    }

    /// Back to idle, dropping baseline, analysis and errors
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_derivation() {
        let mut session = DiffSession::default();
        assert_eq!(session.phase(), DiffPhase::Idle);

        session.has_active_diff = true;
        assert_eq!(session.phase(), DiffPhase::Computing);

        session.is_diff_ready = true;
        session.is_showing_diff = true;
        assert_eq!(session.phase(), DiffPhase::ActiveShowing);

        session.is_showing_diff = false;
        assert_eq!(session.phase(), DiffPhase::ActiveHidden);

        session.reset();
        assert_eq!(session.phase(), DiffPhase::Idle);
    }

    #[test]
    fn test_owns_baseline_requires_matching_workflow() {
        let session = DiffSession {
            baseline: Some(WorkflowState::new()),
            baseline_workflow_id: Some("wf-1".to_string()),
            ..DiffSession::default()
        };
        assert!(session.owns_baseline_for("wf-1"));
        assert!(!session.owns_baseline_for("wf-2"));
    }
}
