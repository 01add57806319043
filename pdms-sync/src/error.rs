//! Error types for selection, patching and sync actions.

use pdms_types::{CompoundKey, EntityKind, ResolveError, ValueType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for host document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Faults reported by the host document.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentError {
    /// The key does not address an existing shape (stale or invalid key).
    #[error("shape not found: {key}")]
    ShapeNotFound { key: CompoundKey },

    /// The shape has no property with this name.
    #[error("property {name} not found on {key}")]
    PropertyNotFound { key: CompoundKey, name: String },

    /// A value does not match the property's declared type.
    #[error("property {name} expects {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: ValueType,
        actual: ValueType,
    },

    /// Selection was requested for no shapes.
    #[error("selection requires at least one shape")]
    EmptySelection,

    /// Any other host automation failure.
    #[error("host error: {0}")]
    Host(String),
}

/// Why a single patch failed.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatchError {
    #[error("shape not found: {key}")]
    ShapeNotFound { key: CompoundKey },

    #[error("property {name} not found")]
    PropertyNotFound { name: String },

    /// Empty name or value type mismatch.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The patch had no target and nothing was selected.
    #[error("patch has no target and nothing is selected")]
    NoTarget,

    #[error("host error: {0}")]
    Host(String),
}

impl From<DocumentError> for PatchError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::ShapeNotFound { key } => Self::ShapeNotFound { key },
            DocumentError::PropertyNotFound { name, .. } => Self::PropertyNotFound { name },
            DocumentError::TypeMismatch { .. } => Self::Validation(err.to_string()),
            DocumentError::EmptySelection => Self::NoTarget,
            DocumentError::Host(msg) => Self::Host(msg),
        }
    }
}

/// Result type for sync actions.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised while running a sync action, either for the whole action
/// or for one shape.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum SyncError {
    /// Reading shapes from the host failed.
    #[error("collection failed: {0}")]
    Collect(#[from] DocumentError),

    /// Shape data is missing or unusable.
    #[error("invalid shape data: {0}")]
    InvalidData(String),

    /// A referenced backend record does not exist.
    #[error("{kind} {reference} not found")]
    NotFound { kind: EntityKind, reference: String },

    /// Resolving a reference failed at the transport or protocol level.
    #[error("resolve failed: {0}")]
    Resolve(#[from] ResolveError),

    /// Network or backend fault during submission.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend refused an item.
    #[error("rejected by backend: {0}")]
    Rejected(String),

    /// Writing a reconciled value back to the shape failed.
    #[error("reconciliation failed: {0}")]
    Patch(#[from] PatchError),

    #[error("sync action cancelled")]
    Cancelled,
}

impl From<pdms_backend::BackendError> for SyncError {
    fn from(err: pdms_backend::BackendError) -> Self {
        Self::Transport(err.to_string())
    }
}
