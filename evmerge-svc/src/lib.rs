//! evmerge-svc library interface
//!
//! Exposes the router, task store, queue and worker for the binary and for
//! integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod queue;
pub mod sources;
pub mod worker;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::TaskStore;
use crate::queue::TaskQueue;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Durable task records
    pub store: TaskStore,
    /// Sending end of the worker's queue
    pub queue: TaskQueue,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: TaskStore, queue: TaskQueue) -> Self {
        Self {
            store,
            queue,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::task_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        // The browser frontend is served from a different origin
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}
