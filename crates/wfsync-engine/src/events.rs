//! Undo/redo observation of diff lifecycle transitions.
//!
//! The [`DiffStore`](crate::DiffStore) reports every apply, accept and
//! reject to an injected [`UndoRecorder`] so an undo stack can replay or
//! revert it.

use tokio::sync::mpsc;
use wfsync_core::diff::DiffAnalysis;
use wfsync_core::WorkflowState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffEventKind {
    ApplyDiff,
    AcceptDiff,
    RejectDiff,
}

/// One reversible transition: `before` and `after` are full states
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEvent {
    pub kind: DiffEventKind,
    pub workflow_id: String,
    pub before: WorkflowState,
    pub after: WorkflowState,
    pub diff_analysis: Option<DiffAnalysis>,
    pub baseline: Option<WorkflowState>,
    pub trigger_message_id: Option<String>,
}

/// Trait for observing diff transitions.
///
/// Called synchronously from the store; implementations must not block.
pub trait UndoRecorder: Send + Sync {
    fn record(&self, event: DiffEvent);
}

/// A recorder that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopRecorder;

impl UndoRecorder for NoopRecorder {
    fn record(&self, _event: DiffEvent) {}
}

/// A recorder that forwards events to an unbounded channel.
///
/// Unbounded so a slow consumer never stalls the store; volume is one event
/// per user-visible transition.
#[derive(Debug, Clone)]
pub struct ChannelRecorder {
    sender: mpsc::UnboundedSender<DiffEvent>,
}

impl ChannelRecorder {
    pub fn new(sender: mpsc::UnboundedSender<DiffEvent>) -> Self {
        Self { sender }
    }

    /// Create a recorder together with its receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DiffEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl UndoRecorder for ChannelRecorder {
    fn record(&self, event: DiffEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("undo recorder channel closed, dropping event");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn event(kind: DiffEventKind) -> DiffEvent {
        DiffEvent {
            kind,
            workflow_id: "wf".to_string(),
            before: WorkflowState::new(),
            after: WorkflowState::new(),
            diff_analysis: None,
            baseline: None,
            trigger_message_id: None,
        }
    }

    #[test]
    fn test_channel_recorder_forwards_in_order() {
        let (recorder, mut rx) = ChannelRecorder::channel();
        recorder.record(event(DiffEventKind::ApplyDiff));
        recorder.record(event(DiffEventKind::AcceptDiff));

        assert_eq!(rx.try_recv().unwrap().kind, DiffEventKind::ApplyDiff);
        assert_eq!(rx.try_recv().unwrap().kind, DiffEventKind::AcceptDiff);
    }

    #[test]
    fn test_closed_channel_does_not_panic() {
        let (recorder, rx) = ChannelRecorder::channel();
        drop(rx);
        recorder.record(event(DiffEventKind::RejectDiff));
    }
}
