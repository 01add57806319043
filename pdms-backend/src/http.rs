//! HTTP implementation of the backend boundary.
//!
//! Routes (relative to `base_url`):
//! - `GET  /api/v1/functions/{id}`
//! - `GET  /api/v1/materials/{id}`
//! - `GET  /api/v1/materials?code={code}`
//! - `GET  /api/v1/projects/{id}`
//! - `POST /api/v1/sync/batches`
//!
//! A 404 on a record route means "no such record"; any other non-2xx
//! status is a fault.

use crate::backend::PdmsBackend;
use crate::config::BackendConfig;
use crate::error::{BackendError, BackendResult};
use async_trait::async_trait;
use pdms_model::{Function, Material, Project, SubmitAck, SyncBatch};
use pdms_types::{FunctionId, MaterialId, ProjectId};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Backend client speaking the PDMS REST API.
pub struct HttpBackend {
    config: BackendConfig,
    client: Client,
}

impl HttpBackend {
    /// Creates a client from the given configuration.
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// GETs a record, mapping 404 to `None`.
    async fn get_record<T: DeserializeOwned>(&self, path: &str) -> BackendResult<Option<T>> {
        let url = self.url(path);
        debug!(url = %url, "Fetching record");

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(url = %url, "Record not found");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), "Backend fetch failed");
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        let record = serde_json::from_slice(&bytes)?;
        Ok(Some(record))
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout
    } else if err.is_decode() {
        BackendError::Malformed(err.to_string())
    } else {
        BackendError::Network(err.to_string())
    }
}

#[async_trait]
impl PdmsBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_function(&self, id: FunctionId) -> BackendResult<Option<Function>> {
        self.get_record(&format!("/functions/{id}")).await
    }

    async fn fetch_material(&self, id: MaterialId) -> BackendResult<Option<Material>> {
        self.get_record(&format!("/materials/{id}")).await
    }

    async fn fetch_material_by_code(&self, code: &str) -> BackendResult<Option<Material>> {
        self.get_record(&format!("/materials?code={}", urlencoding::encode(code)))
            .await
    }

    async fn fetch_project(&self, id: ProjectId) -> BackendResult<Option<Project>> {
        self.get_record(&format!("/projects/{id}")).await
    }

    async fn submit_batch(&self, batch: &SyncBatch) -> BackendResult<SubmitAck> {
        let url = self.url("/sync/batches");
        debug!(url = %url, batch = %batch.id, items = batch.len(), "Submitting sync batch");

        let response = self
            .authorize(self.client.post(&url))
            .json(batch)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(batch = %batch.id, status = status.as_u16(), "Batch submission rejected");
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
