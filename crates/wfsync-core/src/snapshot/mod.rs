//! Serialized and hashed forms of a workflow state.
//!
//! - [`serializer`]: execution IR, with the round-trip check used before any
//!   candidate state is applied
//! - [`digest`]: content digests recorded in diff metadata

pub mod digest;
pub mod serializer;

pub use digest::state_digest;
pub use serializer::{deserialize_workflow, round_trip_check, serialize_workflow, SerializedWorkflow};
