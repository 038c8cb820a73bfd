//! Redaction wrapper for secrets carried in configuration
//!
//! `Sensitive<T>` keeps API keys and tokens out of `Debug`/`Display`
//! output, so a config struct can be logged wholesale.

use serde::Deserialize;
use std::fmt;

const REDACTED: &str = "***REDACTED***";

/// Wrapper for secret values that redacts itself in Debug and Display
///
/// Deserializes transparently from the inner value, which lets config files
/// declare `api_key = "..."` without any extra nesting. It deliberately has no
/// `Serialize` impl.
///
/// # Example
///
/// ```
/// use wfsync_core_types::Sensitive;
///
/// let key = Sensitive::new("sk-live-123");
/// assert_eq!(format!("{:?}", key), "***REDACTED***");
/// assert_eq!(key.expose(), &"sk-live-123");
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    /// Wrap a secret value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the underlying value, e.g. to put it on an outgoing request header
    pub fn expose(&self) -> &T {
        &self.0
    }

    /// Consume the wrapper and return the inner value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_are_redacted() {
        let key = Sensitive::new("api-key-12345".to_string());
        assert_eq!(format!("{:?}", key), REDACTED);
        assert_eq!(format!("{}", key), REDACTED);
    }

    #[test]
    fn test_expose_and_into_inner() {
        let key = Sensitive::new(String::from("secret"));
        assert_eq!(key.expose(), "secret");
        assert_eq!(key.into_inner(), "secret");
    }

    #[test]
    fn test_deserializes_transparently() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Persistence {
            base_url: String,
            api_key: Sensitive<String>,
        }

        let parsed: Persistence =
            serde_json::from_str(r#"{"base_url":"https://sim.ai","api_key":"sk-1"}"#).unwrap();
        assert_eq!(parsed.api_key.expose(), "sk-1");

        let debug_str = format!("{:?}", parsed);
        assert!(debug_str.contains("https://sim.ai"));
        assert!(!debug_str.contains("sk-1"));
    }
}
