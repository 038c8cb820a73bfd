use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Directed connection between two blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub edge_type: Option<String>,
}

impl Edge {
    /// Create an edge with an explicit id
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            edge_type: None,
        }
    }

    /// Create an edge with a freshly generated id
    pub fn connect(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), source, target)
    }

    /// Builder: set the source handle (e.g. `condition-true`)
    pub fn from_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    /// True if either endpoint is `block_id`
    pub fn touches(&self, block_id: &str) -> bool {
        self.source == block_id || self.target == block_id
    }
}
