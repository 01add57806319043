//! In-memory backend for tests and offline work.
//!
//! Holds records in maps, counts every fetch per lookup key and can be told
//! to delay or fail fetches and submissions.

use crate::backend::PdmsBackend;
use crate::error::{BackendError, BackendResult};
use async_trait::async_trait;
use pdms_model::{
    ChangedRecord, Function, ItemAck, ItemRejection, Material, Project, SubmitAck, SyncBatch,
    UpstreamRecord,
};
use pdms_types::{EntityKind, FunctionId, MaterialId, ProjectId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
struct MockState {
    functions: HashMap<FunctionId, Function>,
    materials: HashMap<MaterialId, Material>,
    projects: HashMap<ProjectId, Project>,
    zone_materials: HashMap<FunctionId, Vec<MaterialId>>,
    fetch_calls: HashMap<String, usize>,
    fetch_failure: Option<BackendError>,
    fetch_delay: Option<Duration>,
    submit_failure: Option<BackendError>,
    submit_delay: Option<Duration>,
    submissions: Vec<SyncBatch>,
    next_function_id: i32,
}

/// A backend that keeps all records in memory.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Seeding ──────────────────────────────────────────────────

    pub fn insert_function(&self, function: Function) {
        let mut state = self.state();
        state.next_function_id = state.next_function_id.max(function.id.get());
        state.functions.insert(function.id, function);
    }

    pub fn insert_material(&self, material: Material) {
        self.state().materials.insert(material.id, material);
    }

    pub fn insert_project(&self, project: Project) {
        self.state().projects.insert(project.id, project);
    }

    pub fn remove_function(&self, id: FunctionId) {
        self.state().functions.remove(&id);
    }

    pub fn remove_material(&self, id: MaterialId) {
        self.state().materials.remove(&id);
    }

    // ── Fault injection ──────────────────────────────────────────

    /// Every fetch fails with `err` until cleared with `None`.
    pub fn fail_fetches(&self, err: Option<BackendError>) {
        self.state().fetch_failure = err;
    }

    /// Every fetch sleeps this long before answering.
    pub fn delay_fetches(&self, delay: Option<Duration>) {
        self.state().fetch_delay = delay;
    }

    /// Every submission fails with `err` until cleared with `None`.
    pub fn fail_submissions(&self, err: Option<BackendError>) {
        self.state().submit_failure = err;
    }

    /// Every submission sleeps this long before answering.
    pub fn delay_submissions(&self, delay: Option<Duration>) {
        self.state().submit_delay = delay;
    }

    // ── Inspection ───────────────────────────────────────────────

    /// Number of fetches issued for a lookup key such as `"function:7"`
    /// or `"material-code:M-100"`.
    pub fn fetch_count(&self, lookup: &str) -> usize {
        self.state().fetch_calls.get(lookup).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.state().fetch_calls.values().sum()
    }

    /// Every batch received, in arrival order (failed submissions included).
    pub fn submissions(&self) -> Vec<SyncBatch> {
        self.state().submissions.clone()
    }

    pub fn function(&self, id: FunctionId) -> Option<Function> {
        self.state().functions.get(&id).cloned()
    }

    pub fn zone_materials(&self, zone: FunctionId) -> Vec<MaterialId> {
        self.state()
            .zone_materials
            .get(&zone)
            .cloned()
            .unwrap_or_default()
    }

    /// Records a fetch and returns the configured delay and failure.
    fn begin_fetch(&self, lookup: String) -> (Option<Duration>, Option<BackendError>) {
        let mut state = self.state();
        *state.fetch_calls.entry(lookup).or_default() += 1;
        (state.fetch_delay, state.fetch_failure.clone())
    }

    async fn fetch<T>(
        &self,
        lookup: String,
        read: impl FnOnce(&MockState) -> Option<T>,
    ) -> BackendResult<Option<T>> {
        let (delay, failure) = self.begin_fetch(lookup);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(read(&self.state()))
    }

    fn apply_batch(&self, batch: &SyncBatch) -> SubmitAck {
        let mut state = self.state();
        let mut ack = SubmitAck::default();

        for item in &batch.items {
            match &item.record {
                UpstreamRecord::Function {
                    function_id,
                    parent_id,
                    kind,
                    code,
                    name,
                    description,
                } => {
                    let id = match function_id {
                        Some(id) if state.functions.contains_key(id) => *id,
                        Some(id) => {
                            ack.rejected.push(ItemRejection {
                                key: item.key.clone(),
                                reason: format!("unknown function {id}"),
                            });
                            continue;
                        }
                        None => {
                            state.next_function_id += 1;
                            FunctionId::new(state.next_function_id)
                        }
                    };
                    let project_id = batch.project_id.unwrap_or(ProjectId::new(0));
                    state.functions.insert(
                        id,
                        Function {
                            id,
                            parent_id: *parent_id,
                            project_id,
                            kind: *kind,
                            code: code.clone(),
                            name: name.clone(),
                            description: description.clone(),
                        },
                    );
                    ack.accepted.push(ItemAck {
                        key: item.key.clone(),
                        function_id: Some(id),
                    });
                    ack.changed.push(ChangedRecord {
                        kind: EntityKind::Function,
                        id: id.get(),
                    });
                }
                UpstreamRecord::ZoneMaterials {
                    zone_id,
                    material_ids,
                } => {
                    if !state.functions.contains_key(zone_id) {
                        ack.rejected.push(ItemRejection {
                            key: item.key.clone(),
                            reason: format!("unknown zone {zone_id}"),
                        });
                        continue;
                    }
                    state.zone_materials.insert(*zone_id, material_ids.clone());
                    ack.accepted.push(ItemAck {
                        key: item.key.clone(),
                        function_id: Some(*zone_id),
                    });
                    let changed = ChangedRecord {
                        kind: EntityKind::Function,
                        id: zone_id.get(),
                    };
                    if !ack.changed.contains(&changed) {
                        ack.changed.push(changed);
                    }
                }
            }
        }

        ack
    }
}

#[async_trait]
impl PdmsBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_function(&self, id: FunctionId) -> BackendResult<Option<Function>> {
        self.fetch(format!("function:{id}"), |s| s.functions.get(&id).cloned())
            .await
    }

    async fn fetch_material(&self, id: MaterialId) -> BackendResult<Option<Material>> {
        self.fetch(format!("material:{id}"), |s| s.materials.get(&id).cloned())
            .await
    }

    async fn fetch_material_by_code(&self, code: &str) -> BackendResult<Option<Material>> {
        self.fetch(format!("material-code:{code}"), |s| {
            s.materials.values().find(|m| m.code == code).cloned()
        })
        .await
    }

    async fn fetch_project(&self, id: ProjectId) -> BackendResult<Option<Project>> {
        self.fetch(format!("project:{id}"), |s| s.projects.get(&id).cloned())
            .await
    }

    async fn submit_batch(&self, batch: &SyncBatch) -> BackendResult<SubmitAck> {
        let (delay, failure) = {
            let mut state = self.state();
            state.submissions.push(batch.clone());
            (state.submit_delay, state.submit_failure.clone())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(self.apply_batch(batch))
    }
}
