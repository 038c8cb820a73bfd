//! Lookup of the chat message that triggered a proposal

use async_trait::async_trait;
use wfsync_core::errors::ExError;

/// Resolves the most recent user message of a workflow's chat thread
#[async_trait]
pub trait MessageCorrelation: Send + Sync {
    /// # Errors
    /// Implementation-specific; callers treat every failure as "unknown".
    async fn latest_user_message_id(&self, workflow_id: &str) -> Result<Option<String>, ExError>;
}

/// No chat attached: every lookup yields `None`.
#[derive(Debug, Clone, Default)]
pub struct NoCorrelation;

#[async_trait]
impl MessageCorrelation for NoCorrelation {
    async fn latest_user_message_id(&self, _workflow_id: &str) -> Result<Option<String>, ExError> {
        Ok(None)
    }
}
