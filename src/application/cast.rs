//! Boundary for loosely typed input.
//!
//! Values arrive as `Box<dyn Any>`, and the caller names the entity handle
//! type they are expected to be. Every value is checked before any entity is
//! touched, so a mismatch never leaves a half-mutated tree behind.

use std::any::{type_name, Any};

use tracing::{debug, instrument};

use crate::application::ApplicationResult;
use crate::domain::{
    flatten_with, unflatten_with, Capability, DomainError, FlattenOptions, Flattenable,
    UnflattenOptions, Unflattenable,
};

/// Flatten a loosely typed root with default options.
pub fn flatten_any<T>(value: Box<dyn Any>) -> ApplicationResult<Vec<Box<dyn Any>>>
where
    T: Flattenable + Send + 'static,
{
    flatten_any_with::<T>(value, &FlattenOptions::default())
}

/// Downcast `value` to `T` and flatten it; results are boxed back up.
#[instrument(level = "debug", skip_all, fields(expected = type_name::<T>()))]
pub fn flatten_any_with<T>(
    value: Box<dyn Any>,
    options: &FlattenOptions,
) -> ApplicationResult<Vec<Box<dyn Any>>>
where
    T: Flattenable + Send + 'static,
{
    let root = downcast::<T>(value, 0, Capability::Traversal)?;
    let flat = flatten_with(root, options)?;
    Ok(flat
        .into_iter()
        .map(|entity| Box::new(entity) as Box<dyn Any>)
        .collect())
}

/// Unflatten loosely typed values with default options.
pub fn unflatten_any<T>(values: Vec<Box<dyn Any>>) -> ApplicationResult<Vec<T>>
where
    T: Unflattenable + 'static,
{
    unflatten_any_with(values, &UnflattenOptions::default())
}

/// Downcast every value to `T`, then unflatten them.
#[instrument(level = "debug", skip_all, fields(expected = type_name::<T>(), values = values.len()))]
pub fn unflatten_any_with<T>(
    values: Vec<Box<dyn Any>>,
    options: &UnflattenOptions,
) -> ApplicationResult<Vec<T>>
where
    T: Unflattenable + 'static,
{
    let entities = values
        .into_iter()
        .enumerate()
        .map(|(index, value)| downcast::<T>(value, index, Capability::Both))
        .collect::<Result<Vec<T>, DomainError>>()?;
    debug!(entities = entities.len(), "all values castable");

    Ok(unflatten_with(entities, options)?)
}

fn downcast<T: 'static>(
    value: Box<dyn Any>,
    index: usize,
    capability: Capability,
) -> Result<T, DomainError> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| DomainError::CapabilityMismatch {
            capability,
            expected: type_name::<T>(),
            index,
        })
}
