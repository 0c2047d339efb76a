//! Application layer: services and use cases
//!
//! This layer orchestrates the domain pipelines and depends on I/O boundary traits.

pub mod cast;
pub mod document;
pub mod error;
pub mod error_ext;
pub mod services;

pub use cast::{flatten_any, flatten_any_with, unflatten_any, unflatten_any_with};
pub use document::{ElementDoc, ElementForest, FlatDocument, FlatRecord};
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
