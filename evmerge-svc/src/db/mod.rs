//! Database access for evmerge-svc

pub mod tasks;

pub use tasks::TaskStore;
