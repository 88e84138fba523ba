//! HTTP surface for the courier dispatch service.
//!
//! Exposes the sent-messages read endpoint, the worker-pool control
//! endpoints, and a health check over axum. Configuration loading lives
//! here as well, layered from defaults, `config.toml`, and the environment.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use courier_core::storage::Storage;
use courier_dispatch::WorkerPool;

pub mod config;
pub mod handlers;
pub mod server;

pub use config::Config;
pub use server::{create_router, start_server};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    /// Storage layer for message reads.
    pub storage: Arc<Storage>,
    /// Worker pool for admission control.
    pub pool: Arc<WorkerPool>,
}

impl AppState {
    /// Creates the application state.
    pub fn new(storage: Arc<Storage>, pool: Arc<WorkerPool>) -> Self {
        Self { storage, pool }
    }
}
