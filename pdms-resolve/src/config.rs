use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resolver tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Upper bound on one remote fetch, including time spent waiting on the
    /// backend (milliseconds).
    pub fetch_timeout_ms: u64,
    /// Longest function lineage walked before giving up.
    pub max_lineage_depth: usize,
}

impl ResolverConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 10_000,
            max_lineage_depth: 32,
        }
    }
}
