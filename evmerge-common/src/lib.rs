//! # evmerge common library
//!
//! Shared code for the evmerge workspace:
//! - Error and result types
//! - Configuration loading and root folder resolution
//! - Domain models (filter specs, raw and normalized records, tasks)
//! - Database initialization and schema migrations

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};
