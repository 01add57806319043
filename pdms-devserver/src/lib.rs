//! Fixture data and HTTP API for the PDMS development server.
//!
//! The router serves any [`PdmsBackend`] over the same REST routes the
//! HTTP client speaks, so a fixture-seeded in-memory backend can stand in
//! for the real service.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use pdms_backend::mock::MockBackend;
use pdms_backend::{BackendError, BackendResult, PdmsBackend};
use pdms_model::{Function, Material, Project, SyncBatch};
use pdms_types::{FunctionId, MaterialId, ProjectId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Records the server starts with.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Fixture {
    pub projects: Vec<Project>,
    pub functions: Vec<Function>,
    pub materials: Vec<Material>,
}

impl Fixture {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// An in-memory backend seeded with every fixture record.
    pub fn into_backend(self) -> MockBackend {
        let backend = MockBackend::new();
        for project in self.projects {
            backend.insert_project(project);
        }
        for function in self.functions {
            backend.insert_function(function);
        }
        for material in self.materials {
            backend.insert_material(material);
        }
        backend
    }
}

type AppState = Arc<dyn PdmsBackend>;

#[derive(Deserialize)]
struct CodeQuery {
    code: String,
}

fn backend_failure(err: &BackendError) -> Response {
    warn!(error = %err, "Backend call failed");
    (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
}

fn record_response<T: Serialize>(what: &str, result: BackendResult<Option<T>>) -> Response {
    match result {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => {
            debug!(record = what, "Not found");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(err) => backend_failure(&err),
    }
}

async fn function_handler(State(backend): State<AppState>, Path(id): Path<i32>) -> Response {
    record_response("function", backend.fetch_function(FunctionId::new(id)).await)
}

async fn material_handler(State(backend): State<AppState>, Path(id): Path<i32>) -> Response {
    record_response("material", backend.fetch_material(MaterialId::new(id)).await)
}

async fn material_by_code_handler(
    State(backend): State<AppState>,
    Query(query): Query<CodeQuery>,
) -> Response {
    record_response("material", backend.fetch_material_by_code(&query.code).await)
}

async fn project_handler(State(backend): State<AppState>, Path(id): Path<i32>) -> Response {
    record_response("project", backend.fetch_project(ProjectId::new(id)).await)
}

async fn submit_handler(State(backend): State<AppState>, Json(batch): Json<SyncBatch>) -> Response {
    match backend.submit_batch(&batch).await {
        Ok(ack) => {
            info!(
                batch = %batch.id,
                accepted = ack.accepted.len(),
                rejected = ack.rejected.len(),
                "Batch processed"
            );
            Json(ack).into_response()
        }
        Err(err) => backend_failure(&err),
    }
}

/// Build the HTTP API router over the given backend.
pub fn build_router(backend: Arc<dyn PdmsBackend>) -> Router {
    Router::new()
        .route("/api/v1/functions/{id}", get(function_handler))
        .route("/api/v1/materials", get(material_by_code_handler))
        .route("/api/v1/materials/{id}", get(material_handler))
        .route("/api/v1/projects/{id}", get(project_handler))
        .route("/api/v1/sync/batches", post(submit_handler))
        .with_state(backend)
}
