//! Ready-made entity handle implementing both capability contracts.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::error::EntityError;
use crate::domain::traits::{Flattenable, Identifiable};

/// Tree node payload behind a [`NodeRef`].
pub struct TreeNode<D> {
    /// Own key
    pub key: String,
    /// Key of the parent node, empty for roots
    pub parent_key: String,
    /// Caller data for this node
    pub data: D,
    /// Materialized children; empty after flattening
    pub children: Vec<NodeRef<D>>,
}

/// Shared, thread-safe handle to a [`TreeNode`].
///
/// Cloning the handle clones the reference, not the node.
pub struct NodeRef<D>(Arc<RwLock<TreeNode<D>>>);

impl<D> Clone for NodeRef<D> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<D> fmt::Debug for NodeRef<D> {
    // children are summarized: a relinked structure may contain cycles
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.lock_read();
        f.debug_struct("NodeRef")
            .field("key", &node.key)
            .field("parent_key", &node.parent_key)
            .field("children", &node.children.len())
            .finish()
    }
}

impl<D> NodeRef<D> {
    pub fn new(key: impl Into<String>, parent_key: impl Into<String>, data: D) -> Self {
        Self(Arc::new(RwLock::new(TreeNode {
            key: key.into(),
            parent_key: parent_key.into(),
            data,
            children: Vec::new(),
        })))
    }

    /// Create a node without a parent.
    pub fn root(key: impl Into<String>, data: D) -> Self {
        Self::new(key, "", data)
    }

    /// Create a node keyed `key` whose parent key is `self`'s key and append it.
    pub fn spawn_child(&self, key: impl Into<String>, data: D) -> NodeRef<D> {
        let child = NodeRef::new(key, self.key(), data);
        self.lock_write().children.push(child.clone());
        child
    }

    /// Append already constructed children, builder style.
    pub fn with_children(self, children: impl IntoIterator<Item = NodeRef<D>>) -> Self {
        self.lock_write().children.extend(children);
        self
    }

    pub fn set_parent_key(&self, parent_key: impl Into<String>) {
        self.lock_write().parent_key = parent_key.into();
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn data(&self) -> D
    where
        D: Clone,
    {
        self.lock_read().data.clone()
    }

    /// Read access to the node.
    pub fn read(&self) -> Result<RwLockReadGuard<'_, TreeNode<D>>, EntityError> {
        self.0
            .read()
            .map_err(|e| EntityError::Poisoned(e.to_string()))
    }

    /// Write access to the node.
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, TreeNode<D>>, EntityError> {
        self.0
            .write()
            .map_err(|e| EntityError::Poisoned(e.to_string()))
    }

    /// Number of nodes reachable from here, including self.
    pub fn count_nodes(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self.clone()];
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.lock_read().children.iter().cloned());
        }
        count
    }

    /// Length of the longest root-to-leaf path, counting nodes; 1 for a leaf.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self.clone(), 1)];
        while let Some((node, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(
                node.lock_read()
                    .children
                    .iter()
                    .map(|child| (child.clone(), depth + 1)),
            );
        }
        deepest
    }

    /// Parent/child edges reachable from here as `(parent_key, child_key)`.
    ///
    /// Two trees with the same edge set are isomorphic modulo sibling order.
    pub fn edges(&self) -> BTreeSet<(String, String)> {
        let mut edges = BTreeSet::new();
        let mut pending = vec![self.clone()];
        while let Some(parent) = pending.pop() {
            let node = parent.lock_read();
            for child in &node.children {
                edges.insert((node.key.clone(), child.key()));
                pending.push(child.clone());
            }
        }
        edges
    }

    fn lock_read(&self) -> RwLockReadGuard<'_, TreeNode<D>> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_write(&self) -> RwLockWriteGuard<'_, TreeNode<D>> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<D> Drop for TreeNode<D> {
    // Unwinds the subtree on a heap stack; a long chain would otherwise drop
    // one nested frame per level.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(child) = pending.pop() {
            if let Ok(lock) = Arc::try_unwrap(child.0) {
                let mut node = lock.into_inner().unwrap_or_else(PoisonError::into_inner);
                pending.append(&mut node.children);
            }
        }
    }
}

impl<D> Flattenable for NodeRef<D> {
    fn children(&self) -> Result<Vec<Self>, EntityError> {
        Ok(self.read()?.children.clone())
    }

    fn unlink_children(&self) -> Result<(), EntityError> {
        self.write()?.children.clear();
        Ok(())
    }
}

impl<D> Identifiable for NodeRef<D> {
    fn key(&self) -> String {
        self.lock_read().key.clone()
    }

    fn parent_key(&self) -> String {
        self.lock_read().parent_key.clone()
    }

    fn append_child(&self, child: &Self) -> Result<(), EntityError> {
        self.write()?.children.push(child.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_child_sets_parent_key() {
        let root = NodeRef::root("a", ());
        let child = root.spawn_child("b", ());

        assert_eq!(child.parent_key(), "a");
        assert_eq!(root.children().unwrap().len(), 1);
        assert!(root.children().unwrap()[0].ptr_eq(&child));
    }

    #[test]
    fn test_unlink_children_empties_child_list() {
        let root = NodeRef::root("a", ());
        root.spawn_child("b", ());
        root.spawn_child("c", ());

        root.unlink_children().unwrap();

        assert!(root.children().unwrap().is_empty());
        assert_eq!(root.count_nodes(), 1);
    }

    #[test]
    fn test_append_child_accumulates_duplicates() {
        let parent = NodeRef::root("p", ());
        let child = NodeRef::new("c", "p", ());

        parent.append_child(&child).unwrap();
        parent.append_child(&child).unwrap();

        assert_eq!(parent.children().unwrap().len(), 2);
    }

    #[test]
    fn test_edges_and_count() {
        let root = NodeRef::root("a", 0);
        let b = root.spawn_child("b", 1);
        b.spawn_child("c", 2);

        assert_eq!(root.count_nodes(), 3);
        let edges: Vec<_> = root.edges().into_iter().collect();
        assert_eq!(
            edges,
            vec![
                ("a".to_string(), "b".to_string()),
                ("b".to_string(), "c".to_string())
            ]
        );
    }

    fn chain(len: usize) -> NodeRef<()> {
        let root = NodeRef::root("n0", ());
        let mut tail = root.clone();
        for i in 1..len {
            tail = tail.spawn_child(format!("n{}", i), ());
        }
        root
    }

    #[test]
    fn test_deep_chain_counts_and_drops() {
        let root = chain(200_000);

        assert_eq!(root.count_nodes(), 200_000);
        assert_eq!(root.depth(), 200_000);
        assert_eq!(root.edges().len(), 199_999);
        drop(root);
    }

    #[test]
    fn test_drop_keeps_externally_held_subtree() {
        let root = NodeRef::root("a", ());
        let b = root.spawn_child("b", ());
        b.spawn_child("c", ());

        drop(root);

        assert_eq!(b.count_nodes(), 2);
        assert_eq!(b.depth(), 2);
    }

    #[test]
    fn test_debug_does_not_recurse() {
        let node = NodeRef::root("self", ());
        node.append_child(&node).unwrap();

        let rendered = format!("{:?}", node);

        assert!(rendered.contains("\"self\""));
        assert!(rendered.contains("children: 1"));
    }
}
