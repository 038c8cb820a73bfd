//! Outbound collaborators: real-time broadcast to other editors and durable
//! persistence of the clean workflow state.

pub mod broadcast;
pub mod persistence;

pub use broadcast::{ChannelBroadcast, CollaborationBroadcast, NoopBroadcast, ReplaceWorkflowState};
pub use persistence::{HttpPersistence, NoopPersistence, PersistenceGateway};
