//! Integration tests for object lifetime and per-object state
//!
//! Tests cover:
//! - Initialization and pre-delete notifications
//! - Immediate, queued and self-requested deletion
//! - Stale handles after slot reuse
//! - Object limits from configuration
//! - Metadata, translation and script binding slots

mod common;

use common::{counter_value, object_db, Counter, NotificationLog, Sprite};
use marionette_core::{
    ObjectDb, ObjectError, RuntimeConfig, Variant, NOTIFICATION_POSTINITIALIZE,
    NOTIFICATION_PREDELETE,
};
use std::collections::HashMap;

// ===== Notifications =====

#[test]
fn test_postinitialize_runs_base_first() {
    let log = NotificationLog::default();
    let mut db = object_db();
    db.instantiate(Sprite::with_log(log.clone())).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            ("Counter", NOTIFICATION_POSTINITIALIZE),
            ("Sprite", NOTIFICATION_POSTINITIALIZE)
        ]
    );
}

#[test]
fn test_predelete_runs_derived_first() {
    let log = NotificationLog::default();
    let mut db = object_db();
    let sprite = db.instantiate(Sprite::with_log(log.clone())).unwrap();
    log.borrow_mut().clear();

    db.free(sprite).unwrap();
    assert_eq!(
        *log.borrow(),
        vec![
            ("Sprite", NOTIFICATION_PREDELETE),
            ("Counter", NOTIFICATION_PREDELETE)
        ]
    );
}

#[test]
fn test_reversed_notification() {
    let log = NotificationLog::default();
    let mut db = object_db();
    let sprite = db.instantiate(Sprite::with_log(log.clone())).unwrap();
    log.borrow_mut().clear();

    db.notification(sprite, 5, true).unwrap();
    assert_eq!(*log.borrow(), vec![("Sprite", 5), ("Counter", 5)]);
}

// ===== Deletion =====

#[test]
fn test_free_invalidates_handle() {
    let mut db = object_db();
    let counter = db.instantiate(Counter::default()).unwrap();
    assert_eq!(db.object_count(), 1);

    db.free(counter).unwrap();
    assert!(!db.is_alive(counter));
    assert_eq!(db.object_count(), 0);
    assert!(matches!(db.free(counter), Err(ObjectError::InvalidInstance(_))));
}

#[test]
fn test_queue_delete_waits_for_pump() {
    let mut db = object_db();
    let counter = db.instantiate(Counter::default()).unwrap();

    db.queue_delete(counter).unwrap();
    assert!(db.is_alive(counter));
    assert!(db.is_queued_for_deletion(counter));
    assert!(matches!(
        db.queue_delete(counter),
        Err(ObjectError::QueuedForDeletion(_))
    ));

    db.flush_deferred();
    assert!(!db.is_alive(counter));
}

#[test]
fn test_free_from_own_method_is_deferred() {
    let mut db = object_db();
    let counter = db.instantiate(Counter::default()).unwrap();

    db.call(counter, "free_self", &[]).unwrap();
    assert!(db.is_alive(counter));
    assert!(db.is_queued_for_deletion(counter));

    db.flush_deferred();
    assert!(!db.is_alive(counter));
}

#[test]
fn test_queue_delete_method_bind() {
    let mut db = object_db();
    let counter = db.instantiate(Counter::default()).unwrap();
    db.call(counter, "queue_delete", &[]).unwrap();
    assert!(db.is_queued_for_deletion(counter));
}

#[test]
fn test_free_rejected_while_queued() {
    let mut db = object_db();
    let counter = db.instantiate(Counter::default()).unwrap();

    db.queue_delete(counter).unwrap();
    assert!(matches!(
        db.free(counter),
        Err(ObjectError::QueuedForDeletion(id)) if id == counter
    ));
    assert!(db.is_alive(counter));
    assert!(db.is_queued_for_deletion(counter));

    assert_eq!(db.flush_deferred(), 1);
    assert!(!db.is_alive(counter));
}

#[test]
fn test_cancel_delete_keeps_object() {
    let mut db = object_db();
    let counter = db.instantiate(Counter::default()).unwrap();
    assert!(!db.cancel_delete(counter).unwrap());

    db.queue_delete(counter).unwrap();
    assert!(db.cancel_delete(counter).unwrap());
    assert!(!db.is_queued_for_deletion(counter));

    db.flush_deferred();
    assert!(db.is_alive(counter));
    assert_eq!(db.pending_deferred(), 0);
}

#[test]
fn test_requeue_after_cancel_deletes_once() {
    let mut db = object_db();
    let counter = db.instantiate(Counter::default()).unwrap();

    db.queue_delete(counter).unwrap();
    db.cancel_delete(counter).unwrap();
    db.queue_delete(counter).unwrap();
    assert_eq!(db.pending_deferred(), 2);

    db.flush_deferred();
    assert!(!db.is_alive(counter));
}

#[test]
fn test_cancel_delete_method_bind() {
    let mut db = object_db();
    let counter = db.instantiate(Counter::default()).unwrap();
    db.queue_delete(counter).unwrap();

    assert_eq!(
        db.call(counter, "cancel_delete", &[]).unwrap(),
        Variant::Bool(true)
    );
    db.flush_deferred();
    assert!(db.is_alive(counter));
    assert!(matches!(
        db.cancel_delete(counter),
        Ok(false)
    ));
}

#[test]
fn test_stale_handle_after_reuse() {
    let mut db = object_db();
    let old = db.instantiate(Counter::default()).unwrap();
    db.free(old).unwrap();
    let new = db.instantiate(Counter::default()).unwrap();

    assert_eq!(old.index(), new.index());
    assert_ne!(old.generation(), new.generation());
    assert_ne!(old, new);
    assert!(!db.is_alive(old));
    assert!(db.is_alive(new));
    assert_eq!(db.get_class(old), None);
    assert!(!db.set(old, "value", 1));

    db.call(new, "increment", &[]).unwrap();
    assert_eq!(counter_value(&db, new), Some(1));
    assert_eq!(counter_value(&db, old), None);
}

#[test]
fn test_id_round_trip_through_variant() {
    let mut db = object_db();
    let counter = db.instantiate(Counter::default()).unwrap();
    let stored = Variant::from(counter);
    assert_eq!(stored.as_object(), Some(counter));
    assert!(db.object_ids().contains(&counter));
}

// ===== Configuration =====

#[test]
fn test_object_limit() {
    let config = RuntimeConfig::from_toml_str("[objects]\nmax_objects = 2\n").unwrap();
    let mut db = ObjectDb::with_config(common::class_db(), config);

    let first = db.instantiate(Counter::default()).unwrap();
    db.instantiate(Counter::default()).unwrap();
    assert!(matches!(
        db.instantiate(Counter::default()),
        Err(ObjectError::Capacity { limit: 2 })
    ));

    db.free(first).unwrap();
    db.instantiate(Counter::default()).unwrap();
}

// ===== Metadata =====

#[test]
fn test_meta_api() {
    let mut db = object_db();
    let counter = db.instantiate(Counter::default()).unwrap();

    db.set_meta(counter, "b", 2).unwrap();
    db.set_meta(counter, "a", 1).unwrap();
    assert_eq!(db.get_meta_list(counter), vec!["b", "a"]);
    assert!(db.has_meta(counter, "a"));

    db.set_meta(counter, "a", Variant::Nil).unwrap();
    assert!(!db.has_meta(counter, "a"));
    assert!(db.remove_meta(counter, "b"));
    assert!(!db.remove_meta(counter, "b"));

    db.free(counter).unwrap();
    assert!(matches!(
        db.set_meta(counter, "a", 1),
        Err(ObjectError::InvalidInstance(_))
    ));
    assert_eq!(db.get_meta(counter, "a"), None);
}

#[test]
fn test_meta_method_binds() {
    let mut db = object_db();
    let counter = db.instantiate(Counter::default()).unwrap();

    db.call(counter, "set_meta", &["speed".into(), 4.into()])
        .unwrap();
    assert_eq!(
        db.call(counter, "get_meta", &["speed".into()]),
        Ok(Variant::from(4))
    );
    assert_eq!(
        db.call(counter, "has_meta", &["speed".into()]),
        Ok(Variant::from(true))
    );
}

// ===== Translation =====

#[test]
fn test_translation() {
    let mut db = object_db();
    let counter = db.instantiate(Counter::default()).unwrap();
    assert_eq!(db.tr(counter, "Hello"), "Hello");

    let catalogue: HashMap<String, String> =
        [("Hello".to_string(), "Bonjour".to_string())].into_iter().collect();
    db.set_translator(Some(Box::new(catalogue)));
    assert_eq!(db.tr(counter, "Hello"), "Bonjour");
    assert_eq!(db.tr(counter, "Unknown"), "Unknown");

    db.set_message_translation(counter, false).unwrap();
    assert!(!db.can_translate_messages(counter));
    assert_eq!(db.tr(counter, "Hello"), "Hello");
}

// ===== Binding slots =====

#[test]
fn test_script_instance_bindings() {
    let mut db = object_db();
    let counter = db.instantiate(Counter::default()).unwrap();

    db.set_script_instance_binding(counter, 3, Box::new(17u32))
        .unwrap();
    assert!(db.has_script_instance_binding(counter, 3));
    assert!(!db.has_script_instance_binding(counter, 0));
    assert_eq!(
        db.get_script_instance_binding(counter, 3)
            .and_then(|data| data.downcast_ref::<u32>()),
        Some(&17)
    );
    assert!(matches!(
        db.set_script_instance_binding(counter, 8, Box::new(())),
        Err(ObjectError::InvalidBindingIndex(8))
    ));
}
