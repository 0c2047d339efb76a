//! Integration tests for the loosely typed flatten/unflatten entry points.

use std::any::Any;

use rstest::rstest;

use unflattened::application::ApplicationError;
use unflattened::domain::Capability;
use unflattened::{
    flatten_any, unflatten_any, unflatten_any_with, DomainError, Element, Flattenable,
    Identifiable, NodeRef, UnflattenOptions,
};

type Node = NodeRef<Element>;

fn boxed(key: &str, parent: &str) -> Box<dyn Any> {
    Box::new(NodeRef::new(key, parent, Element::new(key)))
}

#[test]
fn given_boxed_nodes_when_unflattening_any_then_typed_roots() {
    // Arrange
    let values = vec![boxed("b", "a"), boxed("a", ""), boxed("c", "b")];

    // Act
    let roots = unflatten_any::<Node>(values).unwrap();

    // Assert
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].key(), "a");
    assert_eq!(roots[0].count_nodes(), 3);
}

#[test]
fn given_foreign_value_when_unflattening_any_then_mismatch_names_position() {
    let a = NodeRef::new("a", "", Element::new("a"));
    let b = NodeRef::new("b", "a", Element::new("b"));
    let values: Vec<Box<dyn Any>> = vec![
        Box::new(a.clone()),
        Box::new(b),
        Box::new(42_u32),
    ];

    let result = unflatten_any::<Node>(values);

    match result {
        Err(ApplicationError::Domain(DomainError::CapabilityMismatch {
            capability,
            expected,
            index,
        })) => {
            assert_eq!(capability, Capability::Both);
            assert_eq!(index, 2);
            assert!(expected.contains("NodeRef"));
        }
        other => panic!("expected CapabilityMismatch, got {:?}", other.map(|v| v.len())),
    }
    // nothing is linked before every value is checked
    assert!(a.children().unwrap().is_empty());
}

#[test]
fn given_node_with_other_payload_when_flattening_any_then_mismatch() {
    let root: Box<dyn Any> = Box::new(NodeRef::root("a", ()));

    let result = flatten_any::<Node>(root);

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::CapabilityMismatch {
            capability: Capability::Traversal,
            ..
        }))
    ));
}

#[rstest]
#[case::flatten_entry(Capability::Traversal, "traversal capability required")]
#[case::unflatten_entry(Capability::Both, "traversal+identity capability required")]
fn given_each_entry_point_when_cast_fails_then_message_names_its_capability(
    #[case] capability: Capability,
    #[case] expected: &str,
) {
    let message = match capability {
        Capability::Traversal => flatten_any::<Node>(Box::new("not a node"))
            .unwrap_err()
            .to_string(),
        Capability::Both => unflatten_any::<Node>(vec![Box::new("not a node") as Box<dyn Any>])
            .unwrap_err()
            .to_string(),
    };

    assert!(message.contains(expected), "{}", message);
    assert!(message.contains("position 0"), "{}", message);
}

#[test]
fn given_flattened_boxes_when_unflattening_any_then_round_trip() {
    let root = NodeRef::root("r", Element::new("r"));
    root.spawn_child("x", Element::new("x")).spawn_child("y", Element::new("y"));
    let before = root.edges();

    let flat = flatten_any::<Node>(Box::new(root)).unwrap();
    let roots = unflatten_any_with::<Node>(
        flat,
        &UnflattenOptions {
            detect_cycles: true,
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].edges(), before);
}

#[test]
fn given_no_values_when_unflattening_any_then_empty_input() {
    let result = unflatten_any::<Node>(Vec::new());

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::EmptyInput))
    ));
}
