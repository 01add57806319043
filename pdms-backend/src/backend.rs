use crate::error::BackendResult;
use async_trait::async_trait;
use pdms_model::{Function, Material, Project, SubmitAck, SyncBatch};
use pdms_types::{FunctionId, MaterialId, ProjectId};

/// The request/response contract the core needs from the PDMS backend.
#[async_trait]
pub trait PdmsBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Fetches a function. `Ok(None)` when the backend has no such record.
    async fn fetch_function(&self, id: FunctionId) -> BackendResult<Option<Function>>;

    /// Fetches a material by id.
    async fn fetch_material(&self, id: MaterialId) -> BackendResult<Option<Material>>;

    /// Fetches a material by its catalogue code.
    async fn fetch_material_by_code(&self, code: &str) -> BackendResult<Option<Material>>;

    /// Fetches a project.
    async fn fetch_project(&self, id: ProjectId) -> BackendResult<Option<Project>>;

    /// Submits one batch of upstream writes.
    async fn submit_batch(&self, batch: &SyncBatch) -> BackendResult<SubmitAck>;
}
