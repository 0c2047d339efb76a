//! Unflatten pipeline: relink a keyed collection of entities into trees.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::domain::error::{DomainError, TreeResult};
use crate::domain::traits::Unflattenable;

/// What to do when two entities share a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// Later entity replaces the earlier one in the index
    #[default]
    LastWins,
    /// Fail with `DomainError::DuplicateKey`
    Reject,
}

/// Options for [`unflatten_with`] and [`unflatten_keyed`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnflattenOptions {
    pub duplicate_keys: DuplicateKeyPolicy,
    /// Skip appending a child whose key the parent already lists
    pub dedup_children: bool,
    /// Reject parent-key cycles before relinking anything
    pub detect_cycles: bool,
}

/// Unflatten with default options.
pub fn unflatten<T: Unflattenable>(entities: Vec<T>) -> TreeResult<Vec<T>> {
    unflatten_with(entities, &UnflattenOptions::default())
}

/// Relink `entities` by parent key and return the roots.
///
/// A root is an entity whose parent key names no entity in the collection.
/// Roots come back in input order. Every other entity is appended to its
/// parent, also in input order. The first failing `append_child` aborts the
/// call; links made before it stay in place.
#[instrument(level = "debug", skip_all, fields(entities = entities.len()))]
pub fn unflatten_with<T: Unflattenable>(
    entities: Vec<T>,
    options: &UnflattenOptions,
) -> TreeResult<Vec<T>> {
    if entities.is_empty() {
        return Err(DomainError::EmptyInput);
    }

    let index = build_index(&entities, options.duplicate_keys)?;
    if options.detect_cycles {
        check_acyclic(&index)?;
    }

    let mut roots = Vec::new();
    for entity in entities {
        match index.get(&entity.parent_key()) {
            Some(parent) => link(parent, &entity, options.dedup_children)?,
            None => roots.push(entity),
        }
    }

    debug!(roots = roots.len(), "unflatten complete");
    Ok(roots)
}

/// Relink a caller-built key map and return the roots, ordered by key.
///
/// The map keys are used for parent lookup, not the entities' own keys.
/// `options.duplicate_keys` has no effect here.
#[instrument(level = "debug", skip_all, fields(entities = entities.len()))]
pub fn unflatten_keyed<T: Unflattenable>(
    entities: HashMap<String, T>,
    options: &UnflattenOptions,
) -> TreeResult<Vec<T>> {
    if entities.is_empty() {
        return Err(DomainError::EmptyInput);
    }
    if options.detect_cycles {
        check_acyclic(&entities)?;
    }

    let mut keys: Vec<&String> = entities.keys().collect();
    keys.sort();

    let mut roots = Vec::new();
    for key in keys {
        let entity = &entities[key];
        match entities.get(&entity.parent_key()) {
            Some(parent) => link(parent, entity, options.dedup_children)?,
            None => roots.push(entity.clone()),
        }
    }

    debug!(roots = roots.len(), "unflatten complete");
    Ok(roots)
}

fn build_index<T: Unflattenable>(
    entities: &[T],
    policy: DuplicateKeyPolicy,
) -> TreeResult<HashMap<String, T>> {
    let mut index = HashMap::with_capacity(entities.len());
    for entity in entities {
        let key = entity.key();
        if let Some(previous) = index.insert(key.clone(), entity.clone()) {
            match policy {
                DuplicateKeyPolicy::Reject => return Err(DomainError::DuplicateKey(key)),
                DuplicateKeyPolicy::LastWins => {
                    trace!(key = %previous.key(), "duplicate key replaced in index")
                }
            }
        }
    }
    Ok(index)
}

fn link<T: Unflattenable>(parent: &T, child: &T, dedup: bool) -> TreeResult<()> {
    if dedup {
        let child_key = child.key();
        let existing = parent.children().map_err(DomainError::ChildAccess)?;
        if existing.iter().any(|c| c.key() == child_key) {
            trace!(parent = %parent.key(), child = %child_key, "child already linked");
            return Ok(());
        }
    }

    parent
        .append_child(child)
        .map_err(|source| DomainError::ChildLink {
            parent: parent.key(),
            child: child.key(),
            source,
        })
}

/// Follow every parent chain through `index`; fail if one comes back on itself.
fn check_acyclic<T: Unflattenable>(index: &HashMap<String, T>) -> TreeResult<()> {
    // sorted so the reported key is deterministic
    let starts: BTreeSet<&String> = index.keys().collect();
    let mut settled: HashSet<String> = HashSet::new();

    for start in starts {
        let mut chain = HashSet::new();
        let mut current = start.clone();
        while !settled.contains(&current) {
            if !chain.insert(current.clone()) {
                return Err(DomainError::CycleDetected(current));
            }
            match index.get(&current) {
                Some(entity) => current = entity.parent_key(),
                None => break,
            }
        }
        settled.extend(chain);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::NodeRef;
    use crate::domain::traits::{Flattenable, Identifiable};

    fn keys<T: Identifiable>(entities: &[T]) -> Vec<String> {
        entities.iter().map(|e| e.key()).collect()
    }

    #[test]
    fn test_empty_input_fails() {
        let result = unflatten(Vec::<NodeRef<()>>::new());
        assert!(matches!(result, Err(DomainError::EmptyInput)));
    }

    #[test]
    fn test_roots_are_entities_with_unresolved_parent() {
        let entities = vec![
            NodeRef::new("A", "", ()),
            NodeRef::new("B", "A", ()),
            NodeRef::new("C", "A", ()),
            NodeRef::new("D", "Z", ()),
        ];

        let roots = unflatten(entities).unwrap();

        assert_eq!(keys(&roots), vec!["A", "D"]);
        assert_eq!(keys(&roots[0].children().unwrap()), vec!["B", "C"]);
        assert!(roots[1].children().unwrap().is_empty());
    }

    #[test]
    fn test_self_parent_is_not_checked_by_default() {
        let node = NodeRef::new("loop", "loop", ());

        let roots = unflatten(vec![node.clone()]).unwrap();

        assert!(roots.is_empty());
        assert!(node.children().unwrap()[0].ptr_eq(&node));
    }

    #[test]
    fn test_check_acyclic_accepts_deep_chain() {
        let mut index = HashMap::new();
        for i in 0..50 {
            let parent = if i == 0 { String::new() } else { format!("n{}", i - 1) };
            index.insert(format!("n{i}"), NodeRef::new(format!("n{i}"), parent, ()));
        }

        assert!(check_acyclic(&index).is_ok());
    }

    #[test]
    fn test_unflatten_keyed_orders_roots_by_key() {
        let mut map = HashMap::new();
        map.insert("z".to_string(), NodeRef::new("z", "", ()));
        map.insert("m".to_string(), NodeRef::new("m", "", ()));
        map.insert("c".to_string(), NodeRef::new("c", "z", ()));

        let roots = unflatten_keyed(map, &UnflattenOptions::default()).unwrap();

        assert_eq!(keys(&roots), vec!["m", "z"]);
        assert_eq!(keys(&roots[1].children().unwrap()), vec!["c"]);
    }
}
