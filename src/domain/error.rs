//! Domain-level errors (no external dependencies)

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Which capability contract a value was expected to satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// `Flattenable`: read and detach children
    Traversal,
    /// Both contracts (`Unflattenable`)
    Both,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Traversal => write!(f, "traversal"),
            Capability::Both => write!(f, "traversal+identity"),
        }
    }
}

/// Failures reported by an entity through its capability contracts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    #[error("nil receiver")]
    NilReceiver,

    #[error("nil argument")]
    NilArgument,

    #[error("wrong entity kind: expected {expected}, found {found}")]
    WrongKind { expected: String, found: String },

    #[error("entity lock poisoned: {0}")]
    Poisoned(String),

    #[error("{0}")]
    Other(String),
}

/// Domain errors represent failures of the flatten/unflatten pipelines.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("got empty input")]
    EmptyInput,

    #[error("value at position {index} is not a {expected}: {capability} capability required")]
    CapabilityMismatch {
        capability: Capability,
        expected: &'static str,
        index: usize,
    },

    #[error("cannot append child {child} to parent {parent}: {source}")]
    ChildLink {
        parent: String,
        child: String,
        #[source]
        source: EntityError,
    },

    #[error("cannot access children: {0}")]
    ChildAccess(#[source] EntityError),

    #[error("cycle detected in hierarchy at key: {0}")]
    CycleDetected(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("flatten timed out after {0:?}")]
    Timeout(Duration),

    #[error("flatten cancelled")]
    Cancelled,

    #[error("flatten producer panicked")]
    ProducerPanicked,
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

/// A failed flatten, together with every entity emitted before the failure.
///
/// Emitted entities may already be detached from their parents, so `emitted`
/// is the only way left to reach them.
#[derive(Error)]
#[error("{source}")]
pub struct FlattenError<T> {
    /// Entities emitted before the failure, in pre-order
    pub emitted: Vec<T>,
    #[source]
    pub source: DomainError,
}

impl<T> FlattenError<T> {
    pub fn into_parts(self) -> (Vec<T>, DomainError) {
        (self.emitted, self.source)
    }
}

impl<T> fmt::Debug for FlattenError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlattenError")
            .field("emitted", &self.emitted.len())
            .field("source", &self.source)
            .finish()
    }
}

impl<T> From<FlattenError<T>> for DomainError {
    fn from(e: FlattenError<T>) -> Self {
        e.source
    }
}

/// Result type for flatten: the pre-order sequence, or the failure with partial output.
pub type FlattenResult<T> = Result<Vec<T>, FlattenError<T>>;
