//! Result and error types for the core library

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// These are infrastructure faults only. Expected outcomes such as a wrong
/// password or a duplicate registration are reported through
/// [`OperationResult`] instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Password hashing error: {0}")]
    Hashing(String),

    #[error("Session store error: {0}")]
    Session(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a hashing error
    pub fn hashing(msg: impl Into<String>) -> Self {
        Self::Hashing(msg.into())
    }

    /// Create a session store error
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a business operation
///
/// Always carries both fields; `message` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
}

impl OperationResult {
    /// Create a successful result
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(true, message)
    }

    /// Create a failed result
    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(false, message)
    }

    fn new(success: bool, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            if success { "Operation succeeded" } else { "Operation failed" }.to_string()
        } else {
            message
        };
        Self { success, message }
    }
}
