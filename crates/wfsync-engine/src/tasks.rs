//! Detached background work with per-workflow cancellation

use std::collections::HashMap;
use std::future::Future;

use futures::future::join_all;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Tracks spawned broadcast/persist tasks so they can be awaited or orphaned
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
    tokens: HashMap<String, CancellationToken>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token shared by every task of `workflow_id`, created on first use
    pub fn token_for(&mut self, workflow_id: &str) -> CancellationToken {
        self.tokens
            .entry(workflow_id.to_string())
            .or_default()
            .clone()
    }

    /// Cancel the token of `workflow_id`; later calls to `token_for` get a fresh one
    pub fn cancel(&mut self, workflow_id: &str) -> bool {
        match self.tokens.remove(workflow_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Spawn onto the current tokio runtime; false (with a warning) when none is running
    pub fn spawn<F>(&mut self, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.retain(|h| !h.is_finished());
        match Handle::try_current() {
            Ok(handle) => {
                self.handles.push(handle.spawn(future));
                true
            }
            Err(_) => {
                tracing::warn!("no tokio runtime, skipping background sync");
                false
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Await every task spawned so far
    pub async fn wait_all(&mut self) {
        let handles = std::mem::take(&mut self.handles);
        for result in join_all(handles).await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "background task aborted");
            }
        }
    }
}
