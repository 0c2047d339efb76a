//! Flatten trees of domain objects into keyed sequences and rebuild them.
//!
//! A tree made of [`Flattenable`] entities is walked depth first and emitted
//! in pre-order, each node detached from its children once its subtree is
//! done. A flat sequence of [`Unflattenable`] entities, in any order, is
//! relinked into trees using only each entity's key and parent key.
//!
//! ```
//! use unflattened::{flatten, unflatten, Identifiable, NodeRef};
//!
//! let root = NodeRef::root("a", "A");
//! let b = root.spawn_child("b", "B");
//! b.spawn_child("c", "C");
//!
//! let flat = flatten(root).unwrap();
//! let keys: Vec<String> = flat.iter().map(|n| n.key()).collect();
//! assert_eq!(keys, ["a", "b", "c"]);
//!
//! let roots = unflatten(flat).unwrap();
//! assert_eq!(roots.len(), 1);
//! assert_eq!(roots[0].count_nodes(), 3);
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;

pub use application::{flatten_any, flatten_any_with, unflatten_any, unflatten_any_with};
pub use domain::{
    flatten, flatten_with, unflatten, unflatten_keyed, unflatten_with, CancelToken, DomainError,
    DuplicateKeyPolicy, Element, EntityError, FlattenError, FlattenOptions, FlattenResult,
    FlattenWalk, Flattenable, Identifiable, NodeRef, TreeResult, UnflattenOptions, Unflattenable,
};
