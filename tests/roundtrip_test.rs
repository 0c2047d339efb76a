//! Flatten followed by unflatten restores the same parent/child structure.

use rstest::rstest;

use unflattened::application::document::build_tree;
use unflattened::application::ElementDoc;
use unflattened::domain::SequenceKeys;
use unflattened::{flatten, flatten_with, unflatten, Element, FlattenOptions, Identifiable, NodeRef};

/// `a -> {b1 -> {c11, c12, c13 -> {d131}}, b2 -> {c21, c22}, b3}`
fn scenario() -> NodeRef<Element> {
    let a = NodeRef::root("a", Element::new("a"));
    let b1 = a.spawn_child("b1", Element::new("b").with_id("1").with_attr("battr", "battr-val"));
    b1.spawn_child("c11", Element::new("c").with_id("b11"));
    b1.spawn_child("c12", Element::new("c").with_id("b12"));
    b1.spawn_child("c13", Element::new("c").with_id("b13"))
        .spawn_child("d131", Element::new("d").with_id("c131").with_attr("dattr", "dattr-val"));
    let b2 = a.spawn_child("b2", Element::new("b").with_id("2"));
    b2.spawn_child("c21", Element::new("c").with_id("b21"));
    b2.spawn_child("c22", Element::new("c").with_id("b22"));
    a.spawn_child("b3", Element::new("b").with_id("3"));
    a
}

fn child_set(node: &NodeRef<Element>) -> Vec<String> {
    let mut keys: Vec<String> = node.read().unwrap().children.iter().map(|c| c.key()).collect();
    keys.sort();
    keys
}

fn find(root: &NodeRef<Element>, key: &str) -> Option<NodeRef<Element>> {
    if root.key() == key {
        return Some(root.clone());
    }
    let children = root.read().unwrap().children.clone();
    children.iter().find_map(|c| find(c, key))
}

#[test]
fn given_scenario_tree_when_round_tripping_then_single_root_with_same_children() {
    // Arrange
    let root = scenario();
    let before = root.edges();

    // Act
    let flat = flatten(root).unwrap();
    let roots = unflatten(flat.clone()).unwrap();

    // Assert
    assert_eq!(flat.len(), 10);
    assert_eq!(flat[0].key(), "a");
    assert_eq!(roots.len(), 1);
    let a = &roots[0];
    assert_eq!(a.key(), "a");
    assert_eq!(child_set(a), vec!["b1", "b2", "b3"]);
    assert_eq!(child_set(&find(a, "b1").unwrap()), vec!["c11", "c12", "c13"]);
    assert_eq!(child_set(&find(a, "c13").unwrap()), vec!["d131"]);
    assert_eq!(child_set(&find(a, "b2").unwrap()), vec!["c21", "c22"]);
    assert_eq!(a.edges(), before);
}

#[test]
fn given_round_trip_when_comparing_payloads_then_unchanged() {
    let flat = flatten(scenario()).unwrap();

    let roots = unflatten(flat).unwrap();

    let d = find(&roots[0], "d131").unwrap().data();
    assert_eq!(d.to_string(), "<d id='c131' dattr='dattr-val'>");
}

#[rstest]
#[case::identity(vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9])]
#[case::reversed(vec![9, 8, 7, 6, 5, 4, 3, 2, 1, 0])]
#[case::interleaved(vec![5, 0, 9, 2, 7, 4, 1, 8, 3, 6])]
fn given_permuted_sequence_when_unflattening_then_edges_preserved(#[case] order: Vec<usize>) {
    let root = scenario();
    let before = root.edges();
    let flat = flatten_with(
        root,
        &FlattenOptions {
            buffer_size: 2,
            ..Default::default()
        },
    )
    .unwrap();
    let permuted: Vec<_> = order.iter().map(|&i| flat[i].clone()).collect();

    let roots = unflatten(permuted).unwrap();

    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].edges(), before);
}

#[test]
fn given_generated_keys_when_round_tripping_document_then_same_shape() {
    let doc: ElementDoc = toml::from_str(
        r#"
name = "a"
[[children]]
name = "b"
[[children.children]]
name = "c"
[[children]]
name = "b"
"#,
    )
    .unwrap();
    let mut keys = SequenceKeys::new("k");
    let root = build_tree(&doc, &mut keys);
    let before = root.edges();

    let roots = unflatten(flatten(root).unwrap()).unwrap();

    assert_eq!(roots[0].edges(), before);
    assert_eq!(roots[0].count_nodes(), doc.count());
}
