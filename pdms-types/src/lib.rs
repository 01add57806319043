//! Core type definitions for PDMS shape synchronization.
//!
//! This crate defines the small, dependency-free value types every other
//! crate in the workspace speaks:
//! - Compound keys addressing one shape inside one diagram document
//! - Integer identifiers for backend records (functions, materials, projects)
//! - The three-way [`ResolveResult`] outcome returned by every resolver
//! - Typed shape property values
//!
//! Backend record snapshots and wire types live in `pdms-model`.

mod ids;
mod key;
mod resolve;
mod value;

pub use ids::{EntityKind, FunctionId, MaterialId, ProjectId, RecordId};
pub use key::{CompoundKey, DocumentId, ShapeId};
pub use resolve::{ResolveError, ResolveResult};
pub use value::{PropertyValue, ValueType};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid compound key: {0}")]
    InvalidKey(String),

    #[error("unknown entity kind: {0}")]
    UnknownKind(String),
}
