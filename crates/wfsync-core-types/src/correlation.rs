//! Correlation types for request tracking and tracing
//!
//! Every orchestrator operation gets a `RequestContext`; its ids are written
//! into log events and attached to errors so a failed background persist can
//! be traced back to the call that scheduled it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! correlation_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh, time-ordered id (UUIDv7)
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            /// Get the string representation
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Wrap an id received from elsewhere
            pub fn from_string(s: String) -> Self {
                Self(s)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

correlation_id!(
    /// Unique identifier for a single orchestrator call
    RequestId
);

correlation_id!(
    /// Trace identifier shared by a call and the background work it spawns
    TraceId
);

/// Context carried through operation boundaries for correlation
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub trace_id: TraceId,
    pub workflow_id: Option<String>,
}

impl RequestContext {
    /// Create a context with fresh ids and no workflow
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            trace_id: TraceId::new(),
            workflow_id: None,
        }
    }

    /// Create a context scoped to a workflow
    pub fn for_workflow(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: Some(workflow_id.into()),
            ..Self::new()
        }
    }

    /// Derive a child context for background work: same trace, new request id
    pub fn child(&self) -> Self {
        Self {
            request_id: RequestId::new(),
            trace_id: self.trace_id.clone(),
            workflow_id: self.workflow_id.clone(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
