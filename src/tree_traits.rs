//! Rendering of node handles as `termtree` trees.

use std::fmt::Display;

use termtree::Tree;
use tracing::instrument;

use crate::domain::{NodeRef, TreeNode};

pub trait TreeNodeConvert {
    /// Render with node data only.
    fn to_tree_string(&self) -> Tree<String>;

    /// Render with node data followed by the node key.
    fn to_keyed_tree_string(&self) -> Tree<String>;
}

impl<D: Display> TreeNodeConvert for NodeRef<D> {
    #[instrument(level = "trace", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        render(self, &|node: &TreeNode<D>| node.data.to_string())
    }

    #[instrument(level = "trace", skip(self))]
    fn to_keyed_tree_string(&self) -> Tree<String> {
        render(self, &|node: &TreeNode<D>| {
            format!("{} [{}]", node.data, node.key)
        })
    }
}

enum Step<D> {
    Open(NodeRef<D>),
    Close(String, usize),
}

fn render<D>(
    node: &NodeRef<D>,
    label: &dyn Fn(&TreeNode<D>) -> String,
) -> Tree<String> {
    let mut steps = vec![Step::Open(node.clone())];
    let mut done: Vec<Tree<String>> = Vec::new();

    while let Some(step) = steps.pop() {
        match step {
            Step::Open(node) => match node.read() {
                Ok(node_borrowed) => {
                    let children = &node_borrowed.children;
                    steps.push(Step::Close(label(&node_borrowed), children.len()));
                    steps.extend(children.iter().rev().cloned().map(Step::Open));
                }
                Err(e) => done.push(Tree::new(format!("<{}>", e))),
            },
            Step::Close(text, n) => {
                let leaves = done.split_off(done.len() - n);
                done.push(Tree::new(text).with_leaves(leaves));
            }
        }
    }
    done.pop().unwrap_or_else(|| Tree::new(String::new()))
}
