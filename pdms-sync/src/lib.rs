//! Shape selection, property patching and upstream sync actions.
//!
//! Everything that touches the live diagram goes through the
//! [`HostDocument`] boundary:
//!
//! - [`select`] selects shapes by compound key, all-or-nothing.
//! - [`PatchPipeline`] applies batches of [`PropertyPatch`]es, grouped by
//!   target, and reports a per-patch outcome.
//! - [`SyncDispatcher`] runs a [`SyncAction`]: collect shapes, resolve their
//!   references, submit one batch upstream, then reconcile locally.
//!
//! # Example
//!
//! ```
//! use pdms_sync::memory::MemoryDocument;
//! use pdms_sync::{PatchPipeline, PropertyPatch};
//! use pdms_types::{CompoundKey, DocumentId, PropertyValue, ShapeId};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let key = CompoundKey::new(DocumentId::new(1), ShapeId::new(4));
//! let document = Arc::new(MemoryDocument::new());
//! document.add_shape(key.clone(), "FunctionGroup", [("FunctionCode", PropertyValue::from("G-4"))]);
//!
//! let pipeline = PatchPipeline::new(document.clone());
//! let result = pipeline
//!     .apply([PropertyPatch::new("FunctionId", 12).target(key.clone()).create_if_missing()], None)
//!     .await;
//!
//! assert!(result.is_success());
//! assert_eq!(document.value(&key, "FunctionId"), Some(PropertyValue::Integer(12)));
//! # });
//! ```

mod action;
mod config;
mod dispatcher;
mod document;
mod error;
pub mod memory;
mod patch;
pub mod props;
mod report;
mod selection;

pub use action::SyncAction;
pub use config::SyncConfig;
pub use dispatcher::SyncDispatcher;
pub use document::{HostDocument, ShapeSnapshot};
pub use error::{DocumentError, DocumentResult, PatchError, SyncError, SyncResult};
pub use patch::{ApplyResult, PatchOutcome, PatchPipeline, PatchStatus, PropertyPatch, TargetOutcome};
pub use report::{ItemFailure, SyncReport, SyncStage, SyncStatus};
pub use selection::select;
