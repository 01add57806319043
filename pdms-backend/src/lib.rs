//! Boundary to the PDMS master-data backend.
//!
//! The core needs three things from the backend: fetch a record by
//! id, fetch a material by code, and submit a batch of upstream writes.
//! [`PdmsBackend`] captures that contract; [`HttpBackend`] speaks it over
//! HTTP and [`mock::MockBackend`] keeps everything in memory for tests and
//! offline work.
//!
//! Fetches distinguish "no such record" (`Ok(None)`) from faults (`Err`).
//! Retrying is left to callers.

mod backend;
mod config;
mod error;
pub mod http;
pub mod mock;

pub use backend::PdmsBackend;
pub use config::BackendConfig;
pub use error::{BackendError, BackendResult};
pub use http::HttpBackend;
