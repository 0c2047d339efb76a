//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{DomainError, FlattenError};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid document {}: {message}", path.display())]
    Document { path: PathBuf, message: String },

    #[error("tree too deep: depth {depth} exceeds limit {limit}")]
    TooDeep { depth: usize, limit: usize },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl<T> From<FlattenError<T>> for ApplicationError {
    fn from(e: FlattenError<T>) -> Self {
        ApplicationError::Domain(e.source)
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
