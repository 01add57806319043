use crate::action::SyncAction;
use crate::error::SyncError;
use crate::patch::ApplyResult;
use pdms_model::{ChangedRecord, SyncBatch};
use pdms_types::CompoundKey;
use serde::{Deserialize, Serialize};

/// Phase of a sync action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Collect,
    Resolve,
    Submit,
    Reconcile,
}

/// Overall result of one sync action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Submitted, accepted and reconciled without any failure.
    Completed,
    /// The upstream write stands but some items or local write-backs failed.
    CompletedWithWarnings,
    /// No shape produced anything to submit.
    NothingToSync,
    /// Collection failed; nothing was sent upstream.
    Aborted,
    /// The submission failed; local state is untouched.
    SubmitFailed,
    /// Cancelled before submission, or during reconciliation.
    Cancelled,
}

/// A failure attributed to one shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub key: CompoundKey,
    pub stage: SyncStage,
    pub error: SyncError,
}

/// Everything an operator needs to know about one sync run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub action: SyncAction,
    pub status: SyncStatus,
    /// Action-level error for `Aborted`, `SubmitFailed` and `Cancelled`.
    pub error: Option<SyncError>,
    /// Shapes that were skipped or rejected.
    pub failures: Vec<ItemFailure>,
    /// Items sent upstream.
    pub submitted: usize,
    /// Items the backend accepted.
    pub accepted: usize,
    /// The batch to resend after a failed submission.
    pub retry_batch: Option<SyncBatch>,
    /// Local write-backs applied after acceptance.
    pub reconciliation: Option<ApplyResult>,
    /// Records dropped from the resolver cache after acceptance.
    pub invalidated: Vec<ChangedRecord>,
}

impl SyncReport {
    pub(crate) fn new(action: SyncAction) -> Self {
        Self {
            action,
            status: SyncStatus::NothingToSync,
            error: None,
            failures: Vec::new(),
            submitted: 0,
            accepted: 0,
            retry_batch: None,
            reconciliation: None,
            invalidated: Vec::new(),
        }
    }

    pub(crate) fn fail(&mut self, key: CompoundKey, stage: SyncStage, error: SyncError) {
        self.failures.push(ItemFailure { key, stage, error });
    }

    /// True only for a clean `Completed` run.
    pub fn is_success(&self) -> bool {
        self.status == SyncStatus::Completed
    }

    /// Keys of every shape that needs attention, in report order, without
    /// duplicates.
    pub fn failed_keys(&self) -> Vec<CompoundKey> {
        let mut keys: Vec<CompoundKey> = Vec::new();
        let reconcile = self
            .reconciliation
            .iter()
            .flat_map(|r| r.failures())
            .filter_map(|(patch, _)| patch.target.clone());
        for key in self.failures.iter().map(|f| f.key.clone()).chain(reconcile) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    pub fn failures_in(&self, stage: SyncStage) -> impl Iterator<Item = &ItemFailure> {
        self.failures.iter().filter(move |f| f.stage == stage)
    }
}
