//! Property patches and the pipeline that applies them.
//!
//! A [`PropertyPatch`] is one declarative write: set property `name` on a
//! shape to `value`, optionally creating the property and attaching a
//! display formula. [`PatchPipeline::apply`] groups patches by target and
//! applies each group in the order given, isolating failures per patch.

use crate::document::HostDocument;
use crate::error::PatchError;
use pdms_types::{CompoundKey, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// One property write intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyPatch {
    /// Shape to write to. `None` defers to the pipeline's default target.
    #[serde(default)]
    pub target: Option<CompoundKey>,
    pub name: String,
    pub value: PropertyValue,
    #[serde(default)]
    pub create_if_missing: bool,
    /// Display formula applied after the value is written.
    #[serde(default)]
    pub label_formula: Option<String>,
}

impl PropertyPatch {
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            target: None,
            name: name.into(),
            value: value.into(),
            create_if_missing: false,
            label_formula: None,
        }
    }

    #[must_use]
    pub fn target(mut self, key: CompoundKey) -> Self {
        self.target = Some(key);
        self
    }

    #[must_use]
    pub fn create_if_missing(mut self) -> Self {
        self.create_if_missing = true;
        self
    }

    #[must_use]
    pub fn label_formula(mut self, formula: impl Into<String>) -> Self {
        self.label_formula = Some(formula.into());
        self
    }
}

/// What a successful patch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    Updated,
    Created,
}

/// Outcome of one patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOutcome {
    /// The patch as applied, with its target filled in when one was found.
    pub patch: PropertyPatch,
    pub result: Result<PatchStatus, PatchError>,
}

impl PatchOutcome {
    pub fn name(&self) -> &str {
        &self.patch.name
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes for every patch addressed to one target, in application order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOutcome {
    /// `None` for patches that had no target and no fallback.
    pub target: Option<CompoundKey>,
    pub patches: Vec<PatchOutcome>,
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        self.patches.iter().all(PatchOutcome::is_success)
    }
}

/// Per-target, per-patch result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Targets in order of first appearance.
    pub targets: Vec<TargetOutcome>,
}

impl ApplyResult {
    pub fn is_success(&self) -> bool {
        self.targets.iter().all(TargetOutcome::is_success)
    }

    pub fn patch_count(&self) -> usize {
        self.targets.iter().map(|t| t.patches.len()).sum()
    }

    pub fn target(&self, key: &CompoundKey) -> Option<&TargetOutcome> {
        self.targets.iter().find(|t| t.target.as_ref() == Some(key))
    }

    /// Every failed patch with the error that stopped it.
    pub fn failures(&self) -> impl Iterator<Item = (&PropertyPatch, &PatchError)> {
        self.targets
            .iter()
            .flat_map(|t| t.patches.iter())
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.patch, e)))
    }

    /// The failed patches, ready to be re-run.
    pub fn failed_patches(&self) -> Vec<PropertyPatch> {
        self.failures().map(|(patch, _)| patch.clone()).collect()
    }
}

/// Applies property patches to a host document.
#[derive(Clone)]
pub struct PatchPipeline {
    document: Arc<dyn HostDocument>,
}

impl PatchPipeline {
    pub fn new(document: Arc<dyn HostDocument>) -> Self {
        Self { document }
    }

    /// Applies `patches`, grouped by target.
    ///
    /// Untargeted patches go to `default_target`, or when that is `None`
    /// to the primary (first) selected shape. Targets are processed in
    /// order of first appearance and each target's patches run back to back
    /// in the order given.
    pub async fn apply<I>(&self, patches: I, default_target: Option<CompoundKey>) -> ApplyResult
    where
        I: IntoIterator<Item = PropertyPatch>,
    {
        let mut fallback = default_target.map(Some);
        let mut groups: Vec<(Option<CompoundKey>, Vec<PropertyPatch>)> = Vec::new();
        let mut index: HashMap<Option<CompoundKey>, usize> = HashMap::new();

        for mut patch in patches {
            let target = match &patch.target {
                Some(key) => Some(key.clone()),
                None => {
                    if fallback.is_none() {
                        let selection = self.document.current_selection().await;
                        fallback = Some(selection.into_iter().next());
                    }
                    fallback.clone().flatten()
                }
            };
            patch.target = target.clone();
            let slot = *index.entry(target.clone()).or_insert_with(|| {
                groups.push((target, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(patch);
        }

        let mut result = ApplyResult::default();
        for (target, patches) in groups {
            let outcomes = match &target {
                Some(key) => self.apply_target(key, patches).await,
                None => patches
                    .into_iter()
                    .map(|patch| PatchOutcome {
                        patch,
                        result: Err(PatchError::NoTarget),
                    })
                    .collect(),
            };
            result.targets.push(TargetOutcome {
                target,
                patches: outcomes,
            });
        }

        let failed = result.failures().count();
        if failed > 0 {
            warn!(
                targets = result.targets.len(),
                failed,
                "Patch run finished with failures"
            );
        } else {
            debug!(targets = result.targets.len(), patches = result.patch_count(), "Patch run complete");
        }
        result
    }

    async fn apply_target(&self, key: &CompoundKey, patches: Vec<PropertyPatch>) -> Vec<PatchOutcome> {
        if !self.document.contains_shape(key).await {
            debug!(key = %key, count = patches.len(), "Patch target missing");
            return patches
                .into_iter()
                .map(|patch| PatchOutcome {
                    patch,
                    result: Err(PatchError::ShapeNotFound { key: key.clone() }),
                })
                .collect();
        }

        let mut outcomes = Vec::with_capacity(patches.len());
        for patch in patches {
            let result = self.apply_one(key, &patch).await;
            if let Err(err) = &result {
                debug!(key = %key, property = %patch.name, error = %err, "Patch failed");
            }
            outcomes.push(PatchOutcome { patch, result });
        }
        outcomes
    }

    async fn apply_one(&self, key: &CompoundKey, patch: &PropertyPatch) -> Result<PatchStatus, PatchError> {
        let name = patch.name.as_str();
        if name.trim().is_empty() {
            return Err(PatchError::Validation("property name is empty".to_string()));
        }
        if name.trim() != name {
            return Err(PatchError::Validation(format!(
                "property name {name:?} has surrounding whitespace"
            )));
        }

        let status = if self.document.property_exists(key, name).await? {
            self.document.set_property(key, name, &patch.value).await?;
            PatchStatus::Updated
        } else if patch.create_if_missing {
            self.document.create_property(key, name, &patch.value).await?;
            PatchStatus::Created
        } else {
            return Err(PatchError::PropertyNotFound {
                name: name.to_string(),
            });
        };

        if let Some(formula) = &patch.label_formula {
            self.document.set_label_formula(key, name, formula).await?;
        }
        Ok(status)
    }
}
