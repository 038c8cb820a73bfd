pub mod block;
pub mod edge;
pub mod workflow;

pub use block::{BlockData, BlockState, BlockType, DiffStatus, FieldDiff, Position, SubBlockState};
pub use edge::Edge;
pub use workflow::{Loop, LoopType, Parallel, ParallelType, WorkflowMetadata, WorkflowState};

/// Block id → field id → value, the shape held by the subblock value store
pub type WorkflowValues =
    std::collections::BTreeMap<String, std::collections::BTreeMap<String, serde_json::Value>>;
