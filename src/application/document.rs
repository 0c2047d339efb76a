//! TOML encodings of element trees and of their flattened records.
//!
//! A nested [`ElementDoc`] is what users write by hand. A [`FlatDocument`] is
//! the flattened form: one record per element, linked by keys only.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::error_ext::document_error;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DomainError, Element, Identifiable, KeyGenerator, NodeRef};

/// Nested element document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementDoc {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementDoc>,
}

impl ElementDoc {
    pub fn element(&self) -> Element {
        Element {
            name: self.name.clone(),
            id: self.id.clone(),
            attrs: self.attrs.clone(),
        }
    }

    /// Number of elements in this document, including self.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ElementDoc::count).sum::<usize>()
    }
}

/// Several nested documents, one per root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementForest {
    pub roots: Vec<ElementDoc>,
}

/// One flattened element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub key: String,
    #[serde(default)]
    pub parent_key: String,
    pub element: Element,
}

/// Flattened element tree(s).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatDocument {
    pub records: Vec<FlatRecord>,
}

/// Build a node tree from `doc`, assigning a fresh key to every element.
///
/// The root gets an empty parent key; every other node carries its parent's key.
pub fn build_tree(doc: &ElementDoc, keys: &mut dyn KeyGenerator) -> NodeRef<Element> {
    build_node(doc, "", keys)
}

fn build_node(doc: &ElementDoc, parent_key: &str, keys: &mut dyn KeyGenerator) -> NodeRef<Element> {
    let key = keys.next_key();
    let children: Vec<_> = doc
        .children
        .iter()
        .map(|child| build_node(child, &key, keys))
        .collect();
    NodeRef::new(key, parent_key, doc.element()).with_children(children)
}

/// Deepest element nesting accepted when converting back to a document.
pub const MAX_NESTED_DEPTH: usize = 256;

/// Fail with [`ApplicationError::TooDeep`] if `node` nests deeper than [`MAX_NESTED_DEPTH`].
pub fn ensure_depth(node: &NodeRef<Element>) -> ApplicationResult<()> {
    let depth = node.depth();
    if depth > MAX_NESTED_DEPTH {
        return Err(ApplicationError::TooDeep {
            depth,
            limit: MAX_NESTED_DEPTH,
        });
    }
    Ok(())
}

enum Step {
    Open(NodeRef<Element>, usize),
    /// Element still waiting for its last `n` finished children
    Close(ElementDoc, usize),
}

/// Convert a (re)linked node tree back into a nested document.
pub fn to_doc(node: &NodeRef<Element>) -> ApplicationResult<ElementDoc> {
    let mut steps = vec![Step::Open(node.clone(), 1)];
    let mut done: Vec<ElementDoc> = Vec::new();

    while let Some(step) = steps.pop() {
        match step {
            Step::Open(node, depth) => {
                if depth > MAX_NESTED_DEPTH {
                    return Err(ApplicationError::TooDeep {
                        depth,
                        limit: MAX_NESTED_DEPTH,
                    });
                }
                let guard = node.read().map_err(DomainError::ChildAccess)?;
                let doc = ElementDoc {
                    name: guard.data.name.clone(),
                    id: guard.data.id.clone(),
                    attrs: guard.data.attrs.clone(),
                    children: Vec::new(),
                };
                steps.push(Step::Close(doc, guard.children.len()));
                steps.extend(
                    guard
                        .children
                        .iter()
                        .rev()
                        .map(|child| Step::Open(child.clone(), depth + 1)),
                );
            }
            Step::Close(mut doc, n) => {
                doc.children = done.split_off(done.len() - n);
                done.push(doc);
            }
        }
    }
    Ok(done.pop().unwrap_or_default())
}

pub fn to_records(entities: &[NodeRef<Element>]) -> FlatDocument {
    FlatDocument {
        records: entities
            .iter()
            .map(|entity| FlatRecord {
                key: entity.key(),
                parent_key: entity.parent_key(),
                element: entity.data(),
            })
            .collect(),
    }
}

pub fn from_records(doc: FlatDocument) -> Vec<NodeRef<Element>> {
    doc.records
        .into_iter()
        .map(|record| NodeRef::new(record.key, record.parent_key, record.element))
        .collect()
}

pub fn parse_document(content: &str, path: &Path) -> ApplicationResult<ElementDoc> {
    parse_toml(content, path)
}

pub fn parse_records(content: &str, path: &Path) -> ApplicationResult<FlatDocument> {
    parse_toml(content, path)
}

pub fn to_toml<S: Serialize>(value: &S) -> ApplicationResult<String> {
    toml::to_string_pretty(value).map_err(|e| ApplicationError::OperationFailed {
        context: "serialize TOML".to_string(),
        source: Box::new(e),
    })
}

fn parse_toml<D: DeserializeOwned>(content: &str, path: &Path) -> ApplicationResult<D> {
    toml::from_str(content).map_err(|e| document_error(path, e))
}
