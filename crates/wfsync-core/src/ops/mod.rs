pub mod block_ops;
pub mod container_ops;
pub mod edge_ops;
pub mod store;
pub mod subblock_store;
pub mod workspace;

pub use block_ops::normalize_name;
pub use container_ops::{regenerate_containers, regenerate_loops, regenerate_parallels};
pub use store::{ReplaceOptions, WorkflowStore};
pub use subblock_store::SubBlockStore;
pub use workspace::Workspace;
