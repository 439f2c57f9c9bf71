//! Runtime configuration for a probe run.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::ProbeError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:9200";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProbeConfig {
    pub base_url: String,
    /// Index used by the settings scenarios. `None` means a fresh
    /// `testindex-<uuid>` name is generated for each probe.
    pub index_name: Option<String>,
    pub timeout_secs: u64,
    /// Delete the index once the index scenarios have run.
    pub cleanup: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            index_name: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cleanup: true,
        }
    }
}

impl ProbeConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_index_name(mut self, name: &str) -> Self {
        self.index_name = Some(name.to_string());
        self
    }

    /// Timeouts are kept in whole seconds; a fractional part rounds up.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        self
    }

    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Parse a JSON config; absent fields take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ProbeError> {
        serde_json::from_str(raw).map_err(|e| ProbeError::Config(format!("invalid config: {e}")))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ProbeError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ProbeError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ProbeError::Config(format!(
                "base URL {:?} must start with http:// or https://",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ProbeError::Config("timeout must be at least 1 second".into()));
        }
        if let Some(name) = &self.index_name {
            if name.is_empty() || name.contains('/') {
                return Err(ProbeError::Config(format!("invalid index name {name:?}")));
            }
        }
        Ok(())
    }

    /// Configured index name, or a generated one unique to this call.
    pub fn resolve_index_name(&self) -> String {
        self.index_name
            .clone()
            .unwrap_or_else(|| format!("testindex-{}", Uuid::new_v4().simple()))
    }
}
