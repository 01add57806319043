//! Error types for the backend boundary.

use pdms_types::ResolveError;
use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Transport and protocol faults talking to the backend.
///
/// A well-formed "record does not exist" answer is not an error; fetches
/// return `Ok(None)` for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// Non-success status other than 404.
    #[error("backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Client could not be constructed from the configuration.
    #[error("invalid backend configuration: {0}")]
    Config(String),
}

impl BackendError {
    /// Whether retrying the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Malformed(_) | Self::Config(_) => false,
        }
    }
}

impl From<BackendError> for ResolveError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Malformed(detail) => ResolveError::Malformed(detail),
            other => ResolveError::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
