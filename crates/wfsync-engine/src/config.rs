//! Engine configuration
//!
//! Loaded from TOML, every key optional:
//!
//! ```toml
//! source = "copilot"
//! correlation_timeout_ms = 500
//!
//! [persistence]
//! base_url = "https://sim.ai"
//! api_key = "sk-..."
//! timeout_secs = 30
//!
//! [broadcast]
//! immediate = true
//! ```
//!
//! `WFSYNC_BASE_URL` and `WFSYNC_API_KEY` override the file through
//! [`EngineConfig::with_env_overrides`].

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use wfsync_core::errors::{ExError, ExErrorKind};
use wfsync_core_types::Sensitive;

pub const DEFAULT_BASE_URL: &str = "https://sim.ai";
pub const DEFAULT_PERSISTENCE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CORRELATION_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_SOURCE: &str = "copilot";

pub const ENV_BASE_URL: &str = "WFSYNC_BASE_URL";
pub const ENV_API_KEY: &str = "WFSYNC_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub base_url: String,
    pub api_key: Option<Sensitive<String>>,
    pub timeout_secs: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_PERSISTENCE_TIMEOUT_SECS,
        }
    }
}

impl PersistenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Ask collaborators to apply replacements without batching
    pub immediate: bool,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self { immediate: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub persistence: PersistenceConfig,
    pub broadcast: BroadcastConfig,
    /// Upper bound for resolving the triggering chat message
    pub correlation_timeout_ms: u64,
    /// Recorded in diff metadata as the proposal's origin
    pub source: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            persistence: PersistenceConfig::default(),
            broadcast: BroadcastConfig::default(),
            correlation_timeout_ms: DEFAULT_CORRELATION_TIMEOUT_MS,
            source: DEFAULT_SOURCE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document
    ///
    /// # Errors
    /// `Config` if the document is not valid TOML or has mistyped keys.
    pub fn from_toml_str(input: &str) -> Result<Self, ExError> {
        toml::from_str(input).map_err(|e| {
            ExError::new(ExErrorKind::Config)
                .with_op("load_config")
                .with_message(format!("invalid engine config: {}", e))
        })
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// `Io` if the file cannot be read, `Config` if it does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("load_config")
                .with_message(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply `WFSYNC_BASE_URL` / `WFSYNC_API_KEY` from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.persistence.base_url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.persistence.api_key = Some(Sensitive::new(key));
        }
        self
    }

    pub fn correlation_timeout(&self) -> Duration {
        Duration::from_millis(self.correlation_timeout_ms)
    }
}
