pub mod invariants;
pub mod sanitize;
pub mod validation;

pub use sanitize::{validate_and_sanitize, FieldError, SanitizeReport};
pub use validation::validate_workflow_state;
