use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for sync actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Timeout for one batch submission (ms).
    pub submit_timeout_ms: u64,
    /// Attach display formulas to properties written back after a sync.
    pub label_formulas: bool,
}

impl SyncConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            submit_timeout_ms: 30_000,
            label_formulas: true,
        }
    }
}
