//! Domain layer: capability contracts and the flatten/unflatten pipelines
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod element;
pub mod error;
pub mod flatten;
pub mod keys;
pub mod node;
pub mod traits;
pub mod unflatten;

pub use element::Element;
pub use error::{Capability, DomainError, EntityError, FlattenError, FlattenResult, TreeResult};
pub use flatten::{flatten, flatten_with, CancelToken, FlattenOptions, FlattenWalk};
pub use keys::{KeyGenerator, SequenceKeys, UuidKeys};
pub use node::{NodeRef, TreeNode};
pub use traits::{Flattenable, Identifiable, Unflattenable};
pub use unflatten::{unflatten, unflatten_keyed, unflatten_with, DuplicateKeyPolicy, UnflattenOptions};
