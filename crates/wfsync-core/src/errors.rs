use thiserror::Error;
use wfsync_core_types::{RequestId, TraceId};

/// Result type alias using WorkflowError
pub type Result<T> = std::result::Result<T, WorkflowError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code used for programmatic handling,
/// test assertions and the `err.code` log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,
    InvalidName,
    DuplicateName,
    NotFound,
    AlreadyExists,
    DanglingEdge,
    SelfEdge,
    CycleDetected,
    InvalidParent,
    MalformedContainer,
    BlockLocked,

    // Diff session
    /// A diff operation was attempted with no active workflow context
    NoActiveWorkflow,
    /// Accept was called while no diff session is open
    NoActiveDiff,
    /// The diff engine rejected its inputs
    DiffComputationFailed,
    /// Candidate state failed round-trip or semantic validation
    ValidationFailed,
    /// Reject/clear without a baseline for the active workflow (defensive, never returned)
    BaselineMismatch,

    // Integration/IO
    Serialization,
    Persistence,
    /// Background persistence failed; optimistic state was kept
    PersistenceFailed,
    ExternalService,
    Timeout,
    Concurrency,
    Config,
    Io,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidName => "ERR_INVALID_NAME",
            ExErrorKind::DuplicateName => "ERR_DUPLICATE_NAME",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::DanglingEdge => "ERR_DANGLING_EDGE",
            ExErrorKind::SelfEdge => "ERR_SELF_EDGE",
            ExErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            ExErrorKind::InvalidParent => "ERR_INVALID_PARENT",
            ExErrorKind::MalformedContainer => "ERR_MALFORMED_CONTAINER",
            ExErrorKind::BlockLocked => "ERR_BLOCK_LOCKED",
            ExErrorKind::NoActiveWorkflow => "ERR_NO_ACTIVE_WORKFLOW",
            ExErrorKind::NoActiveDiff => "ERR_NO_ACTIVE_DIFF",
            ExErrorKind::DiffComputationFailed => "ERR_DIFF_COMPUTATION_FAILED",
            ExErrorKind::ValidationFailed => "ERR_VALIDATION_FAILED",
            ExErrorKind::BaselineMismatch => "ERR_BASELINE_MISMATCH",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::PersistenceFailed => "ERR_PERSISTENCE_FAILED",
            ExErrorKind::ExternalService => "ERR_EXTERNAL_SERVICE",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification (`kind`) for programmatic handling plus optional
/// context for debugging. `details` holds the individual human-readable
/// messages when one failure aggregates several (diff engine errors,
/// sanitizer field errors).
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    workflow_id: Option<String>,
    block_id: Option<String>,
    field: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<ExError>>,
    details: Vec<String>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            workflow_id: None,
            block_id: None,
            field: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
            details: Vec::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add workflow ID context
    pub fn with_workflow_id(mut self, id: impl Into<String>) -> Self {
        self.workflow_id = Some(id.into());
        self
    }

    /// Add block ID context
    pub fn with_block_id(mut self, id: impl Into<String>) -> Self {
        self.block_id = Some(id.into());
        self
    }

    /// Add field (subblock or property) context
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attach the individual messages behind an aggregate failure
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the workflow ID context, if any
    pub fn workflow_id(&self) -> Option<&str> {
        self.workflow_id.as_deref()
    }

    /// Get the block ID context, if any
    pub fn block_id(&self) -> Option<&str> {
        self.block_id.as_deref()
    }

    /// Get the field context, if any
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the trace ID context, if any
    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Individual messages behind an aggregate failure (empty when not aggregated)
    pub fn details(&self) -> &[String] {
        &self.details
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(workflow_id) = &self.workflow_id {
            write!(f, " (workflow_id: {})", workflow_id)?;
        }
        if let Some(block_id) = &self.block_id {
            write!(f, " (block_id: {})", block_id)?;
        }
        if let Some(field) = &self.field {
            write!(f, " (field: {})", field)?;
        }
        if !self.details.is_empty() {
            write!(f, " [{}]", self.details.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for workflow state operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    // ===== Lookup =====
    /// Block not found in workflow state
    #[error("Block not found: {block_id}")]
    BlockNotFound { block_id: String },

    /// Edge not found in workflow state
    #[error("Edge not found: {edge_id}")]
    EdgeNotFound { edge_id: String },

    /// Block with the same ID already exists
    #[error("Block already exists: {block_id}")]
    BlockAlreadyExists { block_id: String },

    /// Edge with the same ID already exists
    #[error("Edge already exists: {edge_id}")]
    EdgeAlreadyExists { edge_id: String },

    // ===== Naming =====
    /// Block name empty or whitespace-only
    #[error("Invalid block name for {block_id}: {reason}")]
    InvalidBlockName { block_id: String, reason: String },

    /// Another block already uses a name that normalizes to the same value
    #[error("Block name '{name}' conflicts with existing block {existing_block_id}")]
    DuplicateBlockName {
        name: String,
        existing_block_id: String,
    },

    // ===== Edges =====
    /// Edge references a block that does not exist
    #[error("Edge {edge_id} references missing block {block_id}")]
    DanglingEdge { edge_id: String, block_id: String },

    /// Edge connects a block to itself
    #[error("Edge {edge_id} connects block {block_id} to itself")]
    SelfEdge { edge_id: String, block_id: String },

    /// Edge would close a cycle outside a loop/parallel subflow
    #[error("Edge {edge_id} would create a cycle between {source_id} and {target_id}")]
    CycleDetected {
        edge_id: String,
        source_id: String,
        target_id: String,
    },

    // ===== Containers =====
    /// `data.parentId` points at a missing or non-container block
    #[error("Block {block_id} has invalid parent {parent_id}: {reason}")]
    InvalidParent {
        block_id: String,
        parent_id: String,
        reason: String,
    },

    /// Loop or parallel descriptor does not match the blocks it describes
    #[error("Malformed container {container_id}: {reason}")]
    MalformedContainer {
        container_id: String,
        reason: String,
    },

    /// Block is locked and cannot be mutated
    #[error("Block {block_id} is locked")]
    BlockLocked { block_id: String },

    // ===== State shape =====
    /// Map key and embedded ID disagree, or an ID is empty
    #[error("Invalid workflow state: {reason}")]
    InvalidState { reason: String },

    // ===== Internal =====
    /// Serialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Round-trip serialization changed the state's shape
    #[error("Round-trip mismatch: {reason}")]
    RoundTripMismatch { reason: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversion from WorkflowError to ExError
///
/// Maps each domain variant onto the canonical taxonomy, carrying the
/// block/field context across.
impl From<WorkflowError> for ExError {
    fn from(err: WorkflowError) -> Self {
        let message = err.to_string();
        match err {
            WorkflowError::BlockNotFound { block_id } => ExError::new(ExErrorKind::NotFound)
                .with_block_id(block_id)
                .with_message(message),

            WorkflowError::EdgeNotFound { .. } => {
                ExError::new(ExErrorKind::NotFound).with_message(message)
            }

            WorkflowError::BlockAlreadyExists { block_id } => {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_block_id(block_id)
                    .with_message(message)
            }

            WorkflowError::EdgeAlreadyExists { .. } => {
                ExError::new(ExErrorKind::AlreadyExists).with_message(message)
            }

            WorkflowError::InvalidBlockName { block_id, .. } => {
                ExError::new(ExErrorKind::InvalidName)
                    .with_block_id(block_id)
                    .with_field("name")
                    .with_message(message)
            }

            WorkflowError::DuplicateBlockName {
                existing_block_id, ..
            } => ExError::new(ExErrorKind::DuplicateName)
                .with_block_id(existing_block_id)
                .with_field("name")
                .with_message(message),

            WorkflowError::DanglingEdge { block_id, .. } => {
                ExError::new(ExErrorKind::DanglingEdge)
                    .with_block_id(block_id)
                    .with_message(message)
            }

            WorkflowError::SelfEdge { block_id, .. } => ExError::new(ExErrorKind::SelfEdge)
                .with_block_id(block_id)
                .with_message(message),

            WorkflowError::CycleDetected { source_id, .. } => {
                ExError::new(ExErrorKind::CycleDetected)
                    .with_block_id(source_id)
                    .with_message(message)
            }

            WorkflowError::InvalidParent { block_id, .. } => {
                ExError::new(ExErrorKind::InvalidParent)
                    .with_block_id(block_id)
                    .with_field("parentId")
                    .with_message(message)
            }

            WorkflowError::MalformedContainer { container_id, .. } => {
                ExError::new(ExErrorKind::MalformedContainer)
                    .with_block_id(container_id)
                    .with_message(message)
            }

            WorkflowError::BlockLocked { block_id } => ExError::new(ExErrorKind::BlockLocked)
                .with_block_id(block_id)
                .with_message(message),

            WorkflowError::InvalidState { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }

            WorkflowError::Serialization { .. } | WorkflowError::RoundTripMismatch { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            WorkflowError::Internal { .. } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to WorkflowError
impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        WorkflowError::Serialization {
            message: err.to_string(),
        }
    }
}
