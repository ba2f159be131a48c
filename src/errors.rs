//! Internal error type shared by the configuration and persistence layers.
//!
//! HTTP handlers convert these into [`crate::server::api_error::ApiError`],
//! which owns the status-code mapping.

use thiserror::Error;

/// Errors raised below the HTTP layer.
#[derive(Debug, Error)]
pub enum StockroomError {
    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The database rejected or failed an operation.
    #[error("database error: {0}")]
    DatabaseError(String),

    /// A write referenced a row that does not exist, or removed one still referenced.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A unique column already holds the written value.
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// Token issuing or password hashing failed.
    #[error("authentication error: {0}")]
    AuthError(String),

    #[error("server error: {0}")]
    ServerError(String),
}

/// Result alias used across the crate.
pub type StockroomResult<T> = Result<T, StockroomError>;
