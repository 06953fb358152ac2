//! Delete tests
//!
//! Deletes are conditioned on the version observed at read time and can be
//! gated by a caller confirmation.

use crate::common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn delete_by_filter() {
    let tc = TestCollection::new();
    tc.insert(json!({"_id": "a", "status": "stale"}));
    tc.insert(json!({"_id": "b", "status": "fresh"}));

    let result = tc
        .delete_one(&doc(json!({"status": "stale"})), DeleteOptions::new())
        .unwrap();
    assert_eq!(result.deleted_count, 1);
    assert!(tc.get("a").is_none());
    assert!(tc.get("b").is_some());
}

#[test]
fn delete_returns_removed_envelope() {
    let tc = TestCollection::new();
    let inserted = tc.insert(json!({"_id": "a"}));
    let m = tc
        .delete_by_id(&Value::from("a"), DeleteOptions::new())
        .unwrap();
    assert_eq!(m.record, Some(inserted));
}

#[test]
fn delete_missing_is_noop() {
    let tc = TestCollection::new();
    let m = tc
        .delete_by_id(&Value::from("ghost"), DeleteOptions::new())
        .unwrap();
    assert!(m.record.is_none());
    assert_eq!(m.result.deleted_count, 0);
}

#[test]
fn confirm_gate_declines_without_store_write() {
    let tc = TestCollection::new();
    let inserted = tc.insert(json!({"_id": "a", "locked": true}));
    let asked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&asked);

    let m = tc
        .delete_by_id(
            &Value::from("a"),
            DeleteOptions::new().confirm(move |value, record| {
                counter.fetch_add(1, Ordering::SeqCst);
                assert_eq!(value, &record.value);
                value.get("locked") != Some(&Value::Bool(true))
            }),
        )
        .unwrap();

    assert_eq!(asked.load(Ordering::SeqCst), 1);
    assert_eq!(m.result.deleted_count, 0);
    assert_eq!(m.record, Some(inserted));
    assert_eq!(tc.store().len(), 1);
}

#[test]
fn confirm_gate_approves() {
    let tc = TestCollection::new();
    tc.insert(json!({"_id": "a", "locked": false}));
    let result = tc
        .delete_one(
            &doc(json!({"_id": "a"})),
            DeleteOptions::new().confirm(|value, _| value.get("locked") == Some(&Value::Bool(false))),
        )
        .unwrap();
    assert_eq!(result.deleted_count, 1);
    assert!(tc.store().is_empty());
}

#[test]
fn delete_with_expected_version() {
    let tc = TestCollection::new();
    let v1 = tc.insert(json!({"_id": "a", "n": 0})).version;
    tc.update_by_id(&Value::from("a"), increment("n", 1), UpdateOptions::new())
        .unwrap();

    let err = tc
        .delete_by_id(&Value::from("a"), DeleteOptions::new().expect_version(v1.as_str()))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::VersionAssertionFailed);
    assert_eq!(tc.store().len(), 1);

    let current = tc.get("a").unwrap().version;
    tc.delete_by_id(&Value::from("a"), DeleteOptions::new().expect_version(current.as_str()))
        .unwrap();
    assert!(tc.store().is_empty());
}

#[test]
fn delete_on_missing_with_expected_version_fails() {
    let tc = TestCollection::new();
    let err = tc
        .delete_by_id(&Value::from("ghost"), DeleteOptions::new().expect_version("abc"))
        .unwrap_err();
    assert!(matches!(
        err,
        SlotError::VersionAssertionFailed { actual: None, .. }
    ));
}
