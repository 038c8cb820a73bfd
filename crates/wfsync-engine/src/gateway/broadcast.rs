use async_trait::async_trait;
use tokio::sync::mpsc;

use wfsync_core::errors::{ExError, ExErrorKind};
use wfsync_core::WorkflowState;

/// Full-state replacement sent to collaborators
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceWorkflowState {
    pub workflow_id: String,
    /// Always marker-free
    pub state: WorkflowState,
    /// Apply on receipt instead of batching
    pub immediate: bool,
}

/// Fan-out of state replacements to other connected editors
#[async_trait]
pub trait CollaborationBroadcast: Send + Sync {
    /// Queue a replacement for delivery
    ///
    /// # Errors
    /// `ExternalService` when the transport is gone.
    async fn enqueue_replace_workflow_state(&self, op: ReplaceWorkflowState) -> Result<(), ExError>;
}

/// Single-user mode: nothing to broadcast to.
#[derive(Debug, Clone, Default)]
pub struct NoopBroadcast;

#[async_trait]
impl CollaborationBroadcast for NoopBroadcast {
    async fn enqueue_replace_workflow_state(&self, _op: ReplaceWorkflowState) -> Result<(), ExError> {
        Ok(())
    }
}

/// Hands replacements to a socket writer task through an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelBroadcast {
    sender: mpsc::UnboundedSender<ReplaceWorkflowState>,
}

impl ChannelBroadcast {
    pub fn new(sender: mpsc::UnboundedSender<ReplaceWorkflowState>) -> Self {
        Self { sender }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ReplaceWorkflowState>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl CollaborationBroadcast for ChannelBroadcast {
    async fn enqueue_replace_workflow_state(&self, op: ReplaceWorkflowState) -> Result<(), ExError> {
        let workflow_id = op.workflow_id.clone();
        self.sender.send(op).map_err(|_| {
            ExError::new(ExErrorKind::ExternalService)
                .with_op("enqueue_replace_workflow_state")
                .with_workflow_id(workflow_id)
                .with_message("broadcast channel closed")
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn op(id: &str) -> ReplaceWorkflowState {
        ReplaceWorkflowState {
            workflow_id: id.to_string(),
            state: WorkflowState::new(),
            immediate: true,
        }
    }

    #[tokio::test]
    async fn test_channel_broadcast_delivers() {
        let (broadcast, mut rx) = ChannelBroadcast::channel();
        broadcast.enqueue_replace_workflow_state(op("wf-1")).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.workflow_id, "wf-1");
        assert!(received.immediate);
    }

    #[tokio::test]
    async fn test_closed_channel_is_external_service_error() {
        let (broadcast, rx) = ChannelBroadcast::channel();
        drop(rx);

        let err = broadcast
            .enqueue_replace_workflow_state(op("wf-2"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::ExternalService);
        assert_eq!(err.workflow_id(), Some("wf-2"));
    }
}
