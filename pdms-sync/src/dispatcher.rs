//! Sync action dispatcher.
//!
//! Every action runs the same four phases strictly in sequence:
//!
//! 1. **Collect**: read the action's shapes from the host document.
//! 2. **Resolve**: validate and complete each shape's references through
//!    the resolvers. Shapes that fail are reported and left out.
//! 3. **Submit**: send one batch upstream under a timeout.
//! 4. **Reconcile**: invalidate the records the backend changed and write
//!    backend-assigned ids back onto the shapes.
//!
//! A failed collection aborts before anything is sent. A failed submission
//! leaves the document untouched and hands the batch back for retry. Once
//! the backend has accepted a batch its write stands: reconciliation
//! failures and cancellation only produce warnings.

use crate::action::SyncAction;
use crate::config::SyncConfig;
use crate::document::{HostDocument, ShapeSnapshot};
use crate::error::SyncError;
use crate::patch::{PatchPipeline, PropertyPatch};
use crate::props;
use crate::report::{SyncReport, SyncStage, SyncStatus};
use futures::future::join_all;
use pdms_model::{FunctionKind, SubmitAck, SyncBatch, UpstreamRecord};
use pdms_resolve::Resolvers;
use pdms_types::{
    CompoundKey, EntityKind, FunctionId, MaterialId, ProjectId, PropertyValue, ResolveResult,
    ValueType,
};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A local value to write once the backend accepts an item.
#[derive(Debug, Clone)]
enum WriteBack {
    /// The function id the backend assigned to (or confirmed for) the item.
    AssignedFunction { as_text: bool },
    /// A material id resolved before submission.
    Material {
        key: CompoundKey,
        id: MaterialId,
        as_text: bool,
    },
}

/// One batch item together with what to do locally once it is accepted.
#[derive(Debug, Clone)]
struct Prepared {
    key: CompoundKey,
    record: UpstreamRecord,
    project: Option<ProjectId>,
    write_backs: Vec<WriteBack>,
}

impl Prepared {
    /// Every shape behind this item: the contributing material shapes of a
    /// zone, otherwise the item's own shape.
    fn shape_keys(&self) -> Vec<CompoundKey> {
        let materials: Vec<CompoundKey> = self
            .write_backs
            .iter()
            .filter_map(|w| match w {
                WriteBack::Material { key, .. } => Some(key.clone()),
                WriteBack::AssignedFunction { .. } => None,
            })
            .collect();
        if materials.is_empty() {
            vec![self.key.clone()]
        } else {
            materials
        }
    }
}

/// A material shape whose references resolved.
struct Placement {
    key: CompoundKey,
    zone: FunctionId,
    project: ProjectId,
    material: MaterialId,
    as_text: bool,
}

/// Runs sync actions against one document and one backend.
pub struct SyncDispatcher {
    document: Arc<dyn HostDocument>,
    resolvers: Resolvers,
    pipeline: PatchPipeline,
    config: SyncConfig,
}

fn written_as_text(snapshot: &ShapeSnapshot, name: &str) -> bool {
    snapshot
        .get(name)
        .is_some_and(|v| v.value_type() == ValueType::Text)
}

fn id_value(id: i32, as_text: bool) -> PropertyValue {
    if as_text {
        PropertyValue::Text(id.to_string())
    } else {
        PropertyValue::Integer(i64::from(id))
    }
}

/// Reads an optional positive record id from a shape property.
fn optional_id(snapshot: &ShapeSnapshot, name: &str) -> Result<Option<i32>, SyncError> {
    match snapshot.integer(name) {
        None => Ok(None),
        Some(raw) if raw <= 0 => Ok(None),
        Some(raw) => i32::try_from(raw)
            .map(Some)
            .map_err(|_| SyncError::InvalidData(format!("{name} {raw} is out of range"))),
    }
}

/// Turns a resolve outcome into a hard requirement for sync purposes.
fn require<T>(
    outcome: ResolveResult<Option<T>>,
    kind: EntityKind,
    reference: impl Display,
) -> Result<Option<T>, SyncError> {
    match outcome {
        ResolveResult::Found(value) => Ok(value),
        ResolveResult::NotFound => Err(SyncError::NotFound {
            kind,
            reference: reference.to_string(),
        }),
        ResolveResult::Error(err) => Err(SyncError::Resolve(err)),
    }
}

fn stage_of(err: &SyncError) -> SyncStage {
    match err {
        SyncError::InvalidData(_) => SyncStage::Collect,
        _ => SyncStage::Resolve,
    }
}

impl SyncDispatcher {
    pub fn new(document: Arc<dyn HostDocument>, resolvers: Resolvers, config: SyncConfig) -> Self {
        let pipeline = PatchPipeline::new(Arc::clone(&document));
        Self {
            document,
            resolvers,
            pipeline,
            config,
        }
    }

    pub fn resolvers(&self) -> &Resolvers {
        &self.resolvers
    }

    pub fn pipeline(&self) -> &PatchPipeline {
        &self.pipeline
    }

    /// Runs one action to completion.
    pub async fn execute(&self, action: SyncAction) -> SyncReport {
        self.execute_with_cancel(action, &CancellationToken::new())
            .await
    }

    /// Runs one action, honouring `cancel` before submission and during
    /// reconciliation. An in-flight submission is always awaited.
    pub async fn execute_with_cancel(
        &self,
        action: SyncAction,
        cancel: &CancellationToken,
    ) -> SyncReport {
        let mut report = SyncReport::new(action);
        info!(action = %action, "Starting sync action");

        if cancel.is_cancelled() {
            return cancelled(report);
        }

        // ── Collect ──────────────────────────────────────────────
        let shapes = match self.document.find_shapes(action.category()).await {
            Ok(shapes) => shapes,
            Err(err) => {
                warn!(action = %action, error = %err, "Collection failed, aborting");
                report.status = SyncStatus::Aborted;
                report.error = Some(err.into());
                return report;
            }
        };
        debug!(action = %action, shapes = shapes.len(), "Collected shapes");

        // ── Resolve ──────────────────────────────────────────────
        let mut prepared = match action {
            SyncAction::PushFunctionGroups => {
                self.prepare_functions(&shapes, FunctionKind::Group, &mut report)
                    .await
            }
            SyncAction::PushFunctionElements => {
                self.prepare_functions(&shapes, FunctionKind::Element, &mut report)
                    .await
            }
            SyncAction::PushZoneMaterials => self.prepare_zone_materials(&shapes, &mut report).await,
        };

        // One batch belongs to one project; items resolved into another
        // project are reported and left for a separate run.
        let project = prepared.iter().find_map(|p| p.project);
        if let Some(project) = project {
            prepared.retain(|item| match item.project {
                Some(other) if other != project => {
                    debug!(key = %item.key, project = %other, batch_project = %project, "Project mismatch");
                    for key in item.shape_keys() {
                        report.fail(
                            key,
                            SyncStage::Resolve,
                            SyncError::InvalidData(format!(
                                "belongs to project {other}, batch is for project {project}"
                            )),
                        );
                    }
                    false
                }
                _ => true,
            });
        }

        if prepared.is_empty() {
            info!(action = %action, skipped = report.failures.len(), "Nothing to sync");
            report.status = SyncStatus::NothingToSync;
            return report;
        }
        if cancel.is_cancelled() {
            return cancelled(report);
        }

        // ── Submit ───────────────────────────────────────────────
        let mut batch = SyncBatch::new(project);
        for item in &prepared {
            batch.push(item.key.clone(), item.record.clone());
        }
        report.submitted = batch.len();

        let backend = Arc::clone(self.resolvers.backend());
        let submitted =
            tokio::time::timeout(self.config.submit_timeout(), backend.submit_batch(&batch)).await;
        let ack = match submitted {
            Ok(Ok(ack)) => ack,
            Ok(Err(err)) => {
                warn!(action = %action, batch = %batch.id, error = %err, "Submission failed");
                return submit_failed(report, err.into(), batch);
            }
            Err(_) => {
                let ms = self.config.submit_timeout_ms;
                warn!(action = %action, batch = %batch.id, timeout_ms = ms, "Submission timed out");
                let err = SyncError::Transport(format!("submission timed out after {ms} ms"));
                return submit_failed(report, err, batch);
            }
        };

        report.accepted = ack.accepted.len();
        for rejection in &ack.rejected {
            let keys = prepared
                .iter()
                .find(|item| item.key == rejection.key)
                .map(Prepared::shape_keys)
                .unwrap_or_else(|| vec![rejection.key.clone()]);
            for key in keys {
                report.fail(
                    key,
                    SyncStage::Submit,
                    SyncError::Rejected(rejection.reason.clone()),
                );
            }
        }
        info!(
            action = %action,
            batch = %batch.id,
            accepted = ack.accepted.len(),
            rejected = ack.rejected.len(),
            "Batch accepted"
        );

        // ── Reconcile ────────────────────────────────────────────
        self.resolvers.cache().invalidate_changed(&ack.changed);
        report.invalidated = ack.changed.clone();

        let patches = self.reconcile_patches(&prepared, &ack);
        let applied = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.pipeline.apply(patches, None) => Some(result),
        };

        match applied {
            None => {
                warn!(action = %action, "Cancelled during reconciliation; upstream write stands");
                cancelled(report)
            }
            Some(result) => {
                report.status = if report.failures.is_empty() && result.is_success() {
                    SyncStatus::Completed
                } else {
                    SyncStatus::CompletedWithWarnings
                };
                if !result.is_success() {
                    warn!(
                        action = %action,
                        failed = result.failures().count(),
                        "Local reconciliation incomplete"
                    );
                }
                report.reconciliation = Some(result);
                info!(action = %action, status = ?report.status, "Sync action finished");
                report
            }
        }
    }

    // ── Function pushes ──────────────────────────────────────────

    async fn prepare_functions(
        &self,
        shapes: &[ShapeSnapshot],
        kind: FunctionKind,
        report: &mut SyncReport,
    ) -> Vec<Prepared> {
        let outcomes = join_all(shapes.iter().map(|s| self.prepare_function(s, kind))).await;

        let mut prepared = Vec::with_capacity(outcomes.len());
        for (shape, outcome) in shapes.iter().zip(outcomes) {
            match outcome {
                Ok(item) => prepared.push(item),
                Err(err) => {
                    debug!(key = %shape.key, error = %err, "Skipping shape");
                    report.fail(shape.key.clone(), stage_of(&err), err);
                }
            }
        }
        prepared
    }

    async fn prepare_function(
        &self,
        shape: &ShapeSnapshot,
        kind: FunctionKind,
    ) -> Result<Prepared, SyncError> {
        let code = shape
            .text(props::FUNCTION_CODE)
            .ok_or_else(|| SyncError::InvalidData(format!("{} is missing", props::FUNCTION_CODE)))?
            .to_string();
        let name = shape.text(props::FUNCTION_NAME).unwrap_or(&code).to_string();
        let description = shape.text(props::FUNCTION_DESCRIPTION).map(str::to_string);
        let existing_id = optional_id(shape, props::FUNCTION_ID)?.map(FunctionId::new);
        let parent_id = optional_id(shape, props::PARENT_FUNCTION_ID)?.map(FunctionId::new);
        let project_id = optional_id(shape, props::PROJECT_ID)?.map(ProjectId::new);

        let functions = &self.resolvers.functions;
        let existing = require(
            functions.resolve(existing_id).await,
            EntityKind::Function,
            display_opt(existing_id),
        )?;
        if let Some(function) = &existing
            && function.kind != kind
        {
            return Err(SyncError::InvalidData(format!(
                "function {} is a {}, expected a {kind}",
                function.id, function.kind
            )));
        }

        let parent = require(
            functions.resolve(parent_id).await,
            EntityKind::Function,
            display_opt(parent_id),
        )?;

        let project = match project_id {
            Some(_) => require(
                self.resolvers.projects.resolve(project_id).await,
                EntityKind::Project,
                display_opt(project_id),
            )?
            .map(|p| p.id),
            None => parent
                .as_ref()
                .or(existing.as_ref())
                .map(|f| f.project_id),
        };

        Ok(Prepared {
            key: shape.key.clone(),
            record: UpstreamRecord::Function {
                function_id: existing.map(|f| f.id),
                parent_id: parent.map(|p| p.id),
                kind,
                code,
                name,
                description,
            },
            project,
            write_backs: vec![WriteBack::AssignedFunction {
                as_text: written_as_text(shape, props::FUNCTION_ID),
            }],
        })
    }

    // ── Zone materials ───────────────────────────────────────────

    async fn prepare_zone_materials(
        &self,
        shapes: &[ShapeSnapshot],
        report: &mut SyncReport,
    ) -> Vec<Prepared> {
        let outcomes = join_all(shapes.iter().map(|s| self.place_material(s))).await;

        // Zones in id order; each zone's materials in shape order.
        let mut zones: BTreeMap<FunctionId, Prepared> = BTreeMap::new();
        for (shape, outcome) in shapes.iter().zip(outcomes) {
            let placement = match outcome {
                Ok(placement) => placement,
                Err(err) => {
                    debug!(key = %shape.key, error = %err, "Skipping material shape");
                    report.fail(shape.key.clone(), stage_of(&err), err);
                    continue;
                }
            };

            let item = zones.entry(placement.zone).or_insert_with(|| Prepared {
                key: placement.key.clone(),
                record: UpstreamRecord::ZoneMaterials {
                    zone_id: placement.zone,
                    material_ids: Vec::new(),
                },
                project: Some(placement.project),
                write_backs: Vec::new(),
            });
            if let UpstreamRecord::ZoneMaterials { material_ids, .. } = &mut item.record
                && !material_ids.contains(&placement.material)
            {
                material_ids.push(placement.material);
            }
            item.write_backs.push(WriteBack::Material {
                key: placement.key,
                id: placement.material,
                as_text: placement.as_text,
            });
        }

        zones.into_values().collect()
    }

    async fn place_material(&self, shape: &ShapeSnapshot) -> Result<Placement, SyncError> {
        let code = shape
            .text(props::MATERIAL_CODE)
            .ok_or_else(|| SyncError::InvalidData(format!("{} is missing", props::MATERIAL_CODE)))?;
        let function_id = optional_id(shape, props::FUNCTION_ID)?
            .map(FunctionId::new)
            .ok_or_else(|| SyncError::InvalidData(format!("{} is missing", props::FUNCTION_ID)))?;

        let material = require(
            self.resolvers.materials.resolve_code(Some(code)).await,
            EntityKind::Material,
            code,
        )?
        .ok_or_else(|| SyncError::InvalidData(format!("{} is blank", props::MATERIAL_CODE)))?;

        let zone = require(
            self.resolvers.functions.enclosing_zone(function_id).await,
            EntityKind::Function,
            function_id,
        )?
        .ok_or_else(|| {
            SyncError::InvalidData(format!("function {function_id} has no enclosing zone"))
        })?;

        Ok(Placement {
            key: shape.key.clone(),
            zone: zone.id,
            project: zone.project_id,
            material: material.id,
            as_text: written_as_text(shape, props::MATERIAL_ID),
        })
    }

    // ── Reconciliation ───────────────────────────────────────────

    fn reconcile_patches(&self, prepared: &[Prepared], ack: &SubmitAck) -> Vec<PropertyPatch> {
        let mut patches = Vec::new();
        for item in prepared {
            let Some(accepted) = ack.accepted_for(&item.key) else {
                continue;
            };
            for write_back in &item.write_backs {
                let (key, name, value) = match write_back {
                    WriteBack::AssignedFunction { as_text } => {
                        let Some(id) = accepted.function_id else {
                            continue;
                        };
                        (item.key.clone(), props::FUNCTION_ID, id_value(id.get(), *as_text))
                    }
                    WriteBack::Material { key, id, as_text } => {
                        (key.clone(), props::MATERIAL_ID, id_value(id.get(), *as_text))
                    }
                };
                let mut patch = PropertyPatch::new(name, value)
                    .target(key)
                    .create_if_missing();
                if self.config.label_formulas {
                    patch = patch.label_formula(props::label_formula(name));
                }
                patches.push(patch);
            }
        }
        patches
    }
}

fn display_opt<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn cancelled(mut report: SyncReport) -> SyncReport {
    info!(action = %report.action, "Sync action cancelled");
    report.status = SyncStatus::Cancelled;
    report.error = Some(SyncError::Cancelled);
    report
}

fn submit_failed(mut report: SyncReport, error: SyncError, batch: SyncBatch) -> SyncReport {
    report.status = SyncStatus::SubmitFailed;
    report.error = Some(error);
    report.retry_batch = Some(batch);
    report
}
