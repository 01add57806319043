//! Upstream write contract.
//!
//! A sync run collects shape data into a [`SyncBatch`] and submits it in one
//! request. The backend answers with a [`SubmitAck`] listing, per item, what
//! it accepted or rejected and which records it changed.

use crate::FunctionKind;
use pdms_types::{CompoundKey, EntityKind, FunctionId, MaterialId, ProjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a submitted batch. Time-ordered so batches sort by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(Uuid);

impl BatchId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One write intent sent upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum UpstreamRecord {
    /// Create (no `function_id`) or update a function.
    Function {
        #[serde(default)]
        function_id: Option<FunctionId>,
        #[serde(default)]
        parent_id: Option<FunctionId>,
        kind: FunctionKind,
        code: String,
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
    /// Replace the material list attached to a zone.
    ZoneMaterials {
        zone_id: FunctionId,
        material_ids: Vec<MaterialId>,
    },
}

/// A record together with the shape it was collected from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub key: CompoundKey,
    pub record: UpstreamRecord,
}

/// Everything one sync run sends upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncBatch {
    pub id: BatchId,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    pub items: Vec<BatchItem>,
}

impl SyncBatch {
    /// Creates an empty batch with a fresh id.
    pub fn new(project_id: Option<ProjectId>) -> Self {
        Self {
            id: BatchId::new(),
            project_id,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, key: CompoundKey, record: UpstreamRecord) {
        self.items.push(BatchItem { key, record });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keys of every shape that contributed an item.
    pub fn keys(&self) -> impl Iterator<Item = &CompoundKey> {
        self.items.iter().map(|item| &item.key)
    }
}

/// Backend acceptance of one batch item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAck {
    pub key: CompoundKey,
    /// Id assigned to (or confirmed for) a function record.
    #[serde(default)]
    pub function_id: Option<FunctionId>,
}

/// Backend refusal of one batch item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRejection {
    pub key: CompoundKey,
    pub reason: String,
}

/// A record the backend reports as changed by the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangedRecord {
    pub kind: EntityKind,
    pub id: i32,
}

/// Backend answer to a submitted batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubmitAck {
    #[serde(default)]
    pub accepted: Vec<ItemAck>,
    #[serde(default)]
    pub rejected: Vec<ItemRejection>,
    #[serde(default)]
    pub changed: Vec<ChangedRecord>,
}

impl SubmitAck {
    /// The acceptance entry for a shape, if any.
    pub fn accepted_for(&self, key: &CompoundKey) -> Option<&ItemAck> {
        self.accepted.iter().find(|ack| &ack.key == key)
    }
}
