//! Error conversion helpers for document I/O
//!
//! Provides extension traits for attaching path context to failures.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// fs.read_to_string(&path)
    ///     .with_path_context("read document", &path)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(e),
        })
    }
}

/// Turn a (de)serialization failure into a `Document` error for `path`.
pub(crate) fn document_error(path: &Path, err: impl std::fmt::Display) -> ApplicationError {
    ApplicationError::Document {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
