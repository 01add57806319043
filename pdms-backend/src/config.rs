use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for the HTTP backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the PDMS service, without the `/api/v1` suffix.
    pub base_url: String,
    /// Per-request timeout applied by the HTTP client (seconds).
    pub request_timeout_secs: u64,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Bearer token, when the service requires one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5080".to_string(),
            request_timeout_secs: 30,
            user_agent: concat!("pdms-shapesync/", env!("CARGO_PKG_VERSION")).to_string(),
            api_token: None,
        }
    }
}
