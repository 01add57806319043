//! Record model for PDMS shape synchronization.
//!
//! Defines the types exchanged with the PDMS backend:
//! - [`Function`], [`Material`], [`Project`]: read-only record snapshots
//! - [`RemoteEntity`]: the common surface resolvers and caches rely on
//! - [`SyncBatch`], [`UpstreamRecord`], [`SubmitAck`]: the upstream write contract
//!
//! Snapshots are never patched in place. When the backend changes a record,
//! the stale copy is dropped and the record re-resolved.

mod batch;
mod entity;

pub use batch::{BatchId, BatchItem, ChangedRecord, ItemAck, ItemRejection, SubmitAck, SyncBatch, UpstreamRecord};
pub use entity::{Function, FunctionKind, Material, Project, RemoteEntity};
