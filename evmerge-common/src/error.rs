//! Common error types for evmerge

use thiserror::Error;

/// Common result type for evmerge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the store, the worker and the HTTP layer
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed filter payload, rejected before a task is created
    #[error("Invalid filter specification: {0}")]
    InvalidFilterSpec(String),

    /// A data source could not be read or parsed; fails the whole task
    #[error("Data source unavailable: {0}")]
    SourceUnavailable(String),

    /// A single record is missing a required field; the record is dropped
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// Queue/store desynchronization or an illegal state transition
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
