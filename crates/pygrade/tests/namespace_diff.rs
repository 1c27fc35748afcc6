//! Tests for namespace snapshots and `diff`.
//!
//! The diff drives the no-global-change and no-arg-change assertions, so these tests pin
//! down its ordering, its handling of reserved module names and the independence of
//! deep-copied snapshots.

use pretty_assertions::assert_eq;
use pygrade::{Namespace, Object, diff};

fn ns(entries: Vec<(&str, Object)>) -> Namespace {
    entries.into_iter().collect()
}

// =============================================================================
// 1. Added, deleted and modified names
// =============================================================================

/// Identical namespaces produce an empty diff.
#[test]
fn identical_namespaces_have_empty_diff() {
    let before = ns(vec![("x", Object::Int(1)), ("s", Object::str("a"))]);
    let after = before.deep_copy();
    assert!(diff(&before, &after).is_empty());
}

/// Each kind of change is reported in namespace order.
#[test]
fn changes_are_classified() {
    let before = ns(vec![("a", Object::Int(1)), ("b", Object::Int(2)), ("c", Object::Int(3))]);
    let after = ns(vec![("c", Object::Int(30)), ("a", Object::Int(1)), ("e", Object::None), ("d", Object::None)]);
    let changes = diff(&before, &after);
    assert_eq!(changes.added, vec!["e".to_owned(), "d".to_owned()]);
    assert_eq!(changes.deleted, vec!["b".to_owned()]);
    assert_eq!(changes.modified_names().collect::<Vec<_>>(), vec!["c"]);
    assert_eq!(changes.modified[0].before, Object::Int(3));
    assert_eq!(changes.modified[0].after, Object::Int(30));
}

/// A value change without any key change is still a modification.
#[test]
fn modified_value_without_key_change() {
    let before = ns(vec![("x", Object::Int(1))]);
    let after = ns(vec![("x", Object::Int(2))]);
    let changes = diff(&before, &after);
    assert!(changes.added.is_empty() && changes.deleted.is_empty());
    assert_eq!(changes.modified.len(), 1, "x should be reported as modified");
}

/// `1 == 1.0 == True` in Python, so these are not modifications.
#[test]
fn numeric_equality_follows_python() {
    let before = ns(vec![("x", Object::Int(1))]);
    let after = ns(vec![("x", Object::Float(1.0))]);
    assert!(diff(&before, &after).is_empty());
}

// =============================================================================
// 2. Reserved names
// =============================================================================

/// Module dunders never appear in a diff, whatever side they are on.
#[test]
fn reserved_names_are_ignored() {
    let before = ns(vec![("__doc__", Object::None)]);
    let after = ns(vec![("__name__", Object::str("__main__")), ("__builtins__", Object::None)]);
    assert!(diff(&before, &after).is_empty());
}

/// `user_names` skips the same reserved identifiers.
#[test]
fn user_names_skip_reserved() {
    let namespace = ns(vec![("__name__", Object::str("__main__")), ("total", Object::Int(0))]);
    assert_eq!(namespace.user_names().collect::<Vec<_>>(), vec!["total"]);
}

// =============================================================================
// 3. Snapshots
// =============================================================================

/// Mutating a list in the live namespace leaves a deep copy untouched.
#[test]
fn snapshot_is_independent() {
    let live = ns(vec![("items", Object::list(vec![Object::Int(1)]))]);
    let snapshot = live.deep_copy();
    if let Some(Object::List(items)) = live.get("items") {
        items.borrow_mut().push(Object::Int(2));
    }
    assert_eq!(snapshot.get("items").unwrap().py_repr(), "[1]");
    let changes = diff(&snapshot, &live);
    assert_eq!(changes.modified_names().collect::<Vec<_>>(), vec!["items"]);
}

/// Two names bound to one list stay aliased inside one snapshot.
#[test]
fn snapshot_keeps_aliasing() {
    let shared = Object::list(vec![]);
    let live = ns(vec![("a", shared.clone()), ("b", shared)]);
    let snapshot = live.deep_copy();
    let (Some(Object::List(a)), Some(Object::List(b))) = (snapshot.get("a"), snapshot.get("b")) else {
        panic!("expected two lists");
    };
    a.borrow_mut().push(Object::Int(7));
    assert_eq!(b.borrow().len(), 1, "aliases must share the copied list");
}

/// A list containing itself can be copied and compared.
#[test]
fn snapshot_handles_cycles() {
    let items = Object::list(vec![Object::Int(1)]);
    if let Object::List(inner) = &items {
        inner.borrow_mut().push(items.clone());
    }
    let live = ns(vec![("items", items)]);
    let snapshot = live.deep_copy();
    assert_eq!(snapshot.get("items").unwrap().py_repr(), "[1, [...]]");
    assert!(diff(&snapshot, &live).is_empty());
}

fn cyclic_list(first: i64) -> Object {
    let items = Object::list(vec![Object::Int(first)]);
    if let Object::List(inner) = &items {
        inner.borrow_mut().push(items.clone());
    }
    items
}

/// Distinct cyclic values compare by content.
#[test]
fn cyclic_values_compare_by_content() {
    assert_eq!(cyclic_list(1), cyclic_list(1));
    assert_ne!(cyclic_list(1), cyclic_list(2));

    let dict = Object::dict(vec![]);
    let copy = Object::dict(vec![]);
    for value in [&dict, &copy] {
        if let Object::Dict(map) = value {
            map.borrow_mut().insert(Object::str("self"), value.clone());
        }
    }
    assert_eq!(dict, copy);

    let before = ns(vec![("items", cyclic_list(1))]);
    let after = ns(vec![("items", cyclic_list(2))]);
    assert_eq!(diff(&before, &after).modified_names().collect::<Vec<_>>(), vec!["items"]);
}
