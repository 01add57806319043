//! Outcome of resolving a backend reference.

use serde::{Deserialize, Serialize};

/// Why a resolution failed.
///
/// Errors are `Clone` because one single-flight fetch hands the same
/// outcome to every caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum ResolveError {
    /// Network or backend fault (non-2xx, connection refused, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered but the payload could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The fetch did not complete within its timeout.
    #[error("fetch timed out after {0} ms")]
    Timeout(u64),

    /// The fetch leading a single-flight group was dropped before completing.
    #[error("fetch abandoned before completion")]
    Abandoned,

    /// A parent chain exceeded the configured depth (or loops).
    #[error("lineage of {0} exceeds the maximum depth")]
    LineageTooDeep(String),
}

/// Outcome of a single resolver call.
///
/// `NotFound` is a normal business result, not a failure: callers are
/// expected to branch on it. Only transport and protocol faults end up
/// in `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ResolveResult<T> {
    Found(T),
    NotFound,
    Error(ResolveError),
}

impl<T> ResolveResult<T> {
    /// `Found(v)` for `Some(v)`, `NotFound` for `None`.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Found(v),
            None => Self::NotFound,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The resolved value, if any.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(v) => Some(v),
            _ => None,
        }
    }

    /// Borrowing view of the outcome.
    pub fn as_ref(&self) -> ResolveResult<&T> {
        match self {
            Self::Found(v) => ResolveResult::Found(v),
            Self::NotFound => ResolveResult::NotFound,
            Self::Error(e) => ResolveResult::Error(e.clone()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResolveResult<U> {
        match self {
            Self::Found(v) => ResolveResult::Found(f(v)),
            Self::NotFound => ResolveResult::NotFound,
            Self::Error(e) => ResolveResult::Error(e),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> ResolveResult<U>) -> ResolveResult<U> {
        match self {
            Self::Found(v) => f(v),
            Self::NotFound => ResolveResult::NotFound,
            Self::Error(e) => ResolveResult::Error(e),
        }
    }

    /// Collapses absence into `Ok(None)` and keeps faults as `Err`.
    pub fn into_result(self) -> Result<Option<T>, ResolveError> {
        match self {
            Self::Found(v) => Ok(Some(v)),
            Self::NotFound => Ok(None),
            Self::Error(e) => Err(e),
        }
    }
}

impl<T> From<ResolveError> for ResolveResult<T> {
    fn from(err: ResolveError) -> Self {
        Self::Error(err)
    }
}
