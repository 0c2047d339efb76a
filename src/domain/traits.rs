//! Capability contracts for entities taking part in flatten/unflatten.
//!
//! Entities are handled only through these traits, never through a concrete
//! type. Implementors are expected to be cheap handles (`Rc<RefCell<_>>`,
//! `Arc<RwLock<_>>`, ...): the pipelines clone them into their output and
//! mutate the shared node through `&self`.

use crate::domain::error::EntityError;

/// Traversal contract: read children, detach children.
pub trait Flattenable: Clone {
    /// Current children, in stable order.
    fn children(&self) -> Result<Vec<Self>, EntityError>;

    /// Remove all children. Afterwards `children()` must return an empty vector.
    fn unlink_children(&self) -> Result<(), EntityError>;
}

/// Identity contract: own key, parent key, attach a child.
pub trait Identifiable: Clone {
    /// Key of this entity, unique within one flatten/unflatten cycle.
    fn key(&self) -> String;

    /// Key of the intended parent. A key absent from the working collection
    /// (typically the empty string) marks a root.
    fn parent_key(&self) -> String;

    /// Attach `child` as a child of `self`.
    ///
    /// Calls accumulate; appending the same child twice lists it twice.
    fn append_child(&self, child: &Self) -> Result<(), EntityError>;
}

/// Entities satisfying both contracts.
pub trait Unflattenable: Flattenable + Identifiable {}

impl<T: Flattenable + Identifiable> Unflattenable for T {}
