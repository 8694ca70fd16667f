//! Integration tests for the shared dictionary
//!
//! Tests cover:
//! - Get-after-set and create-on-write
//! - Shallow and deep duplication
//! - Order-independent equality and hashing
//! - Removal during cursor iteration
//! - Sharing handles across threads

use marionette_core::{Array, Dictionary, Variant};
use std::thread;

// ===== Basic access =====

#[test]
fn test_get_after_set() {
    let dict = Dictionary::new();
    dict.set("speed", 3.5);
    dict.set(7, "seven");

    assert_eq!(dict.get(&"speed".into()), Some(Variant::from(3.5)));
    assert_eq!(dict.get(&7.into()), Some(Variant::from("seven")));
    assert_eq!(dict.get(&"missing".into()), None);
    assert_eq!(dict.get_or(&"missing".into(), Variant::from(0)), Variant::from(0));
}

#[test]
fn test_keys_are_typed() {
    let dict = Dictionary::new();
    dict.set(1, "int");
    dict.set(1.0, "float");
    dict.set("1", "string");
    assert_eq!(dict.len(), 3);
    assert_eq!(dict.get(&Variant::from(1.0)), Some(Variant::from("float")));
}

#[test]
fn test_keys_values_and_has_all() {
    let dict: Dictionary = [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
    assert_eq!(
        dict.keys().to_vec(),
        vec![Variant::from("a"), Variant::from("b"), Variant::from("c")]
    );
    assert_eq!(
        dict.values().to_vec(),
        vec![Variant::from(1), Variant::from(2), Variant::from(3)]
    );

    let wanted: Array = ["a", "c"].into_iter().collect();
    assert!(dict.has_all(&wanted));
    wanted.push("z");
    assert!(!dict.has_all(&wanted));
}

#[test]
fn test_clear_affects_aliases() {
    let dict: Dictionary = [("a", 1)].into_iter().collect();
    let alias = dict.clone();
    alias.clear();
    assert!(dict.is_empty());
}

// ===== Duplication =====

#[test]
fn test_deep_duplicate_isolates_nested() {
    let inner = Dictionary::new();
    inner.set("hp", 10);
    let outer = Dictionary::new();
    outer.set("stats", inner.clone());

    let shallow = outer.duplicate(false);
    let deep = outer.duplicate(true);
    inner.set("hp", 99);

    let read_hp = |dict: &Dictionary| {
        dict.get(&"stats".into())
            .and_then(|stats| stats.as_dictionary())
            .and_then(|stats| stats.get(&"hp".into()))
    };
    assert_eq!(read_hp(&shallow), Some(Variant::from(99)));
    assert_eq!(read_hp(&deep), Some(Variant::from(10)));
    assert!(!deep.is_same(&outer));
    assert_ne!(deep.id(), outer.id());
}

#[test]
fn test_deep_duplicate_copies_arrays() {
    let items: Array = [1, 2].into_iter().collect();
    let dict = Dictionary::new();
    dict.set("items", items.clone());

    let deep = dict.duplicate(true);
    items.push(3);

    let copied = deep
        .get(&"items".into())
        .and_then(|v| v.as_array())
        .unwrap();
    assert_eq!(copied.len(), 2);
}

// ===== Equality and hashing =====

#[test]
fn test_insertion_order_does_not_affect_equality() {
    let a: Dictionary = [("x", 1), ("y", 2), ("z", 3)].into_iter().collect();
    let b: Dictionary = [("z", 3), ("x", 1), ("y", 2)].into_iter().collect();

    assert_eq!(a, b);
    assert_eq!(a.hash_value(), b.hash_value());
    assert_eq!(Variant::from(a).hash_value(), Variant::from(b).hash_value());
}

#[test]
fn test_different_values_differ() {
    let a: Dictionary = [("x", 1)].into_iter().collect();
    let b: Dictionary = [("x", 2)].into_iter().collect();
    assert_ne!(a, b);
    assert_ne!(a.hash_value(), b.hash_value());
}

#[test]
fn test_dictionary_as_key() {
    let key: Dictionary = [("id", 1)].into_iter().collect();
    let same: Dictionary = [("id", 1)].into_iter().collect();
    let map = Dictionary::new();
    map.set(key, "found");
    assert_eq!(map.get(&same.into()), Some(Variant::from("found")));
}

// ===== Iteration =====

#[test]
fn test_cursor_visits_in_insertion_order() {
    let dict: Dictionary = [("b", 1), ("a", 2), ("c", 3)].into_iter().collect();
    let mut order = Vec::new();
    let mut cursor = dict.next(None);
    while let Some(key) = cursor {
        order.push(key.to_string());
        cursor = dict.next(Some(&key));
    }
    assert_eq!(order, vec!["b", "a", "c"]);
}

#[test]
fn test_erase_previous_key_while_iterating() {
    let dict: Dictionary = (0..50).map(|i| (i, i)).collect();
    let mut previous: Option<Variant> = None;
    let mut cursor = dict.next(None);
    let mut visited = 0;
    while let Some(key) = cursor {
        visited += 1;
        if let Some(prev) = previous.take() {
            assert!(dict.erase(&prev));
        }
        cursor = dict.next(Some(&key));
        previous = Some(key);
    }
    assert_eq!(visited, 50);
    assert_eq!(dict.len(), 1);
    assert_eq!(dict.get_key_at_index(0), Some(Variant::from(49)));
}

#[test]
fn test_sort_changes_iteration_order() {
    let dict: Dictionary = [(3, "c"), (1, "a"), (2, "b")].into_iter().collect();
    dict.sort();
    assert_eq!(dict.get_key_at_index(0), Some(Variant::from(1)));
    assert_eq!(dict.get_value_at_index(2), Some(Variant::from("c")));
}

// ===== Self-reference =====

fn self_containing() -> Dictionary {
    let dict = Dictionary::new();
    dict.set("n", 1);
    dict.set("me", dict.clone());
    dict
}

#[test]
fn test_deep_duplicate_of_self_containing_dictionary_stops() {
    let dict = self_containing();
    let copy = dict.duplicate(true);

    assert!(!copy.is_same(&dict));
    assert_eq!(copy.get(&"n".into()), Some(Variant::from(1)));
    let inner = copy.get(&"me".into()).and_then(|v| v.as_dictionary()).unwrap();
    assert!(!inner.is_same(&dict));
    assert!(!inner.is_same(&copy));
}

#[test]
fn test_comparing_self_containing_dictionaries_stops() {
    let a = self_containing();
    let b = self_containing();

    assert!(a == a.clone());
    assert!(a != b);
    assert_eq!(a.hash_value(), b.hash_value());
}

#[test]
fn test_printing_self_containing_dictionary_stops() {
    let dict = self_containing();
    let text = Variant::from(dict.clone()).to_string();

    assert!(text.starts_with("{n: 1, me: {n: 1, me: "));
    assert!(text.contains("{...}"));
    assert!(format!("{:?}", dict).contains("{...}"));
}

#[test]
fn test_self_containing_array_stops() {
    let array = Array::new();
    array.push(array.clone());

    let copy = array.duplicate(true);
    assert!(!copy.is_same(&array));
    assert_eq!(copy.len(), 1);
    assert!(Variant::from(array.clone()).to_string().contains("[...]"));
    assert!(array != Array::from(vec![Variant::from(Array::new())]));
}

// ===== Threads =====

#[test]
fn test_handles_cross_threads() {
    let dict = Dictionary::new();
    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let dict = dict.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    dict.set(worker * 100 + i, i);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(dict.len(), 100);
}
