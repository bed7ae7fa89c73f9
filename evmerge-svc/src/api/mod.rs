//! HTTP API handlers for evmerge-svc

pub mod health;
pub mod tasks;

pub use health::health_routes;
pub use tasks::task_routes;
