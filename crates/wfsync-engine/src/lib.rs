//! wfsync engine - review-session orchestration
//!
//! Coordinates the synchronous core with the outside world: the
//! [`DiffStore`] runs the propose/accept/reject lifecycle over a shared
//! [`Workspace`](wfsync_core::Workspace) and pushes clean states to
//! collaborators and persistence in the background.

pub mod config;
pub mod correlation;
pub mod diff_store;
pub mod events;
pub mod gateway;
pub mod session;
pub mod tasks;

pub use config::EngineConfig;
pub use diff_store::{DiffStore, ProposalOutcome};
pub use events::{ChannelRecorder, DiffEvent, DiffEventKind, NoopRecorder, UndoRecorder};
pub use session::DiffPhase;
