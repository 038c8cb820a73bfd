use async_trait::async_trait;
use reqwest::Client;

use crate::config::PersistenceConfig;
use wfsync_core::errors::{ExError, ExErrorKind};
use wfsync_core::WorkflowState;
use wfsync_core_types::Sensitive;

const OP_PUT_STATE: &str = "put_workflow_state";

/// Durable storage for the clean workflow state
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Overwrite the stored state of `workflow_id`
    ///
    /// # Errors
    /// * `Timeout` - the backend did not answer in time
    /// * `ExternalService` - the request could not be sent
    /// * `Persistence` - the backend answered with a non-success status
    async fn put_workflow_state(&self, workflow_id: &str, state: &WorkflowState) -> Result<(), ExError>;
}

#[derive(Debug, Clone, Default)]
pub struct NoopPersistence;

#[async_trait]
impl PersistenceGateway for NoopPersistence {
    async fn put_workflow_state(&self, _workflow_id: &str, _state: &WorkflowState) -> Result<(), ExError> {
        Ok(())
    }
}

/// `PUT {base_url}/api/workflows/{id}/state` with the state as JSON body
#[derive(Debug, Clone)]
pub struct HttpPersistence {
    client: Client,
    base_url: String,
    api_key: Option<Sensitive<String>>,
}

impl HttpPersistence {
    /// # Errors
    /// `Config` if the HTTP client cannot be built.
    pub fn new(config: &PersistenceConfig) -> Result<Self, ExError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                ExError::new(ExErrorKind::Config)
                    .with_op("http_persistence_new")
                    .with_message(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn state_url(&self, workflow_id: &str) -> String {
        format!("{}/api/workflows/{}/state", self.base_url, workflow_id)
    }
}

#[async_trait]
impl PersistenceGateway for HttpPersistence {
    async fn put_workflow_state(&self, workflow_id: &str, state: &WorkflowState) -> Result<(), ExError> {
        let url = self.state_url(workflow_id);
        let mut request = self.client.put(&url).json(state);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key.expose().as_str());
        }

        let response = request.send().await.map_err(|e| {
            let kind = if e.is_timeout() {
                ExErrorKind::Timeout
            } else {
                ExErrorKind::ExternalService
            };
            ExError::new(kind)
                .with_op(OP_PUT_STATE)
                .with_workflow_id(workflow_id)
                .with_message(format!("request to {} failed: {}", url, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExError::new(ExErrorKind::Persistence)
                .with_op(OP_PUT_STATE)
                .with_workflow_id(workflow_id)
                .with_message(format!("persistence returned {}: {}", status, body)));
        }

        tracing::debug!(workflow_id = %workflow_id, status = status.as_u16(), "persisted workflow state");
        Ok(())
    }
}
