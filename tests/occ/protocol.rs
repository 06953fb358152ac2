//! Envelope and update protocol tests
//!
//! - insert then read returns the same value with createdAt == updatedAt
//! - accepted updates move version and updatedAt, never createdAt
//! - no-op transforms leave the stored document untouched
//! - version assertions and identifier immutability

use crate::common::*;
use std::cell::Cell;

// ============================================================================
// Insert and read
// ============================================================================

#[test]
fn insert_then_find_returns_equal_value() {
    let tc = TestCollection::new();
    let value = val(json!({
        "_id": "w1",
        "name": "widget",
        "dims": {"w": 2, "h": 3.5},
        "tags": ["a", "b"],
        "price$": 10,
        "a.b": {"c%d": [1, {"e.f": null}]}
    }));
    tc.insert_one(value.clone(), InsertOptions::new()).unwrap();

    let found = tc.find_one(&doc(json!({"_id": "w1"}))).unwrap().unwrap();
    assert_eq!(found, value);

    let record = tc.get("w1").unwrap();
    assert_eq!(record.created_at, record.updated_at);
    assert_eq!(record.id, Value::from("w1"));
}

#[test]
fn insert_result_reports_id() {
    let tc = TestCollection::new();
    let result = tc
        .insert_one(val(json!({"name": "anon"})), InsertOptions::new())
        .unwrap();
    let id = result.inserted_id.expect("insert reports the id");
    assert!(matches!(id, Value::Id(_)));
    assert!(tc.find_by_id(&id).unwrap().is_some());
}

#[test]
fn find_is_lazy_and_restartable() {
    let tc = TestCollection::new();
    for i in 0..5 {
        tc.insert(json!({"_id": i, "even": i % 2 == 0}));
    }
    let filter = doc(json!({"even": true}));
    let first: Vec<Value> = tc.find(&filter).unwrap().collect::<SlotResult<_>>().unwrap();
    let second: Vec<Record> = tc
        .find_records(&filter)
        .unwrap()
        .collect::<SlotResult<_>>()
        .unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
}

// ============================================================================
// Update
// ============================================================================

#[test]
fn update_moves_version_and_updated_at() {
    let tc = TestCollection::new();
    let inserted = tc.insert(json!({"_id": "a", "n": 1}));
    tc.tick();

    let m = tc
        .update_by_id(&Value::from("a"), increment("n", 1), UpdateOptions::new())
        .unwrap();
    let updated = m.record.unwrap();

    assert_ne!(updated.version, inserted.version);
    assert_eq!(updated.created_at, inserted.created_at);
    assert!(updated.updated_at > updated.created_at);
    assert_eq!(int_field(&updated, "n"), Some(2));
    assert_eq!(tc.get("a").unwrap(), updated);
}

#[test]
fn update_one_by_field_filter() {
    let tc = TestCollection::new();
    tc.insert(json!({"_id": "a", "email": "a@x", "n": 0}));
    tc.insert(json!({"_id": "b", "email": "b@x", "n": 0}));

    let result = tc
        .update_one(&doc(json!({"email": "b@x"})), increment("n", 5), UpdateOptions::new())
        .unwrap();
    assert_eq!(result.matched_count, 1);
    assert_eq!(int_field(&tc.get("a").unwrap(), "n"), Some(0));
    assert_eq!(int_field(&tc.get("b").unwrap(), "n"), Some(5));
}

#[test]
fn keep_leaves_document_bit_for_bit() {
    let tc = TestCollection::new();
    let inserted = tc.insert(json!({"_id": "a", "n": 1}));
    let before = tc.store().documents();
    tc.tick();

    let m = tc
        .update_by_id(&Value::from("a"), |_, _| Ok(Outcome::Keep), UpdateOptions::new())
        .unwrap();

    assert_eq!(m.record, Some(inserted));
    assert_eq!(m.result.matched_count, 0);
    assert_eq!(tc.store().documents(), before);
}

#[test]
fn transform_sees_value_and_envelope() {
    let tc = TestCollection::new();
    let inserted = tc.insert(json!({"_id": "a", "n": 1}));
    tc.update_by_id(
        &Value::from("a"),
        |v, record| {
            assert_eq!(v, inserted.value);
            assert_eq!(record, Some(&inserted));
            Ok(Outcome::Keep)
        },
        UpdateOptions::new(),
    )
    .unwrap();
}

#[test]
fn update_on_missing_record_is_silent_noop() {
    let tc = TestCollection::new();
    let called = Cell::new(false);
    let m = tc
        .update_by_id(
            &Value::from("ghost"),
            |v, _| {
                called.set(true);
                Ok(Outcome::Put(v))
            },
            UpdateOptions::new(),
        )
        .unwrap();
    assert!(!called.get());
    assert!(m.record.is_none());
    assert!(tc.store().is_empty());
}

#[test]
fn changing_id_fails_and_leaves_original() {
    let tc = TestCollection::new();
    let inserted = tc.insert(json!({"_id": "a", "n": 1}));
    let err = tc
        .update_by_id(&Value::from("a"), set_field("_id", Value::from("b")), UpdateOptions::new())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidUpdate);
    assert_eq!(tc.get("a").unwrap(), inserted);
    assert!(tc.get("b").is_none());
}

#[test]
fn non_object_transform_result_is_invalid_value() {
    let tc = TestCollection::new();
    tc.insert(json!({"_id": "a"}));
    for bad in [Value::Null, val(json!([1, 2])), Value::from("s")] {
        let err = tc
            .update_by_id(
                &Value::from("a"),
                move |_, _| Ok(Outcome::Put(bad.clone())),
                UpdateOptions::new(),
            )
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);
    }
}

// ============================================================================
// Version assertions
// ============================================================================

#[test]
fn expected_version_mismatch_fails_without_write() {
    let tc = TestCollection::new();
    tc.insert(json!({"_id": "a", "n": 1}));
    let before = tc.store().documents();
    let called = Cell::new(false);

    let err = tc
        .update_by_id(
            &Value::from("a"),
            |v, _| {
                called.set(true);
                Ok(Outcome::Put(v))
            },
            UpdateOptions::new().expect_version("someone-else"),
        )
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::VersionAssertionFailed);
    assert!(!called.get());
    assert_eq!(tc.store().documents(), before);
}

#[test]
fn expected_version_chain() {
    let tc = TestCollection::new();
    let v1 = tc.insert(json!({"_id": "a", "n": 0})).version;

    let v2 = tc
        .update_by_id(
            &Value::from("a"),
            increment("n", 1),
            UpdateOptions::new().expect_version(v1.as_str()),
        )
        .unwrap()
        .record
        .unwrap()
        .version;

    // v1 is stale now
    let err = tc
        .update_by_id(
            &Value::from("a"),
            increment("n", 1),
            UpdateOptions::new().expect_version(v1.as_str()),
        )
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::VersionAssertionFailed);

    // any member of the set is accepted
    tc.update_by_id(
        &Value::from("a"),
        increment("n", 1),
        UpdateOptions::new().expect_versions([v1.as_str(), v2.as_str()]),
    )
    .unwrap();
    assert_eq!(int_field(&tc.get("a").unwrap(), "n"), Some(2));
}

#[test]
fn malformed_expected_version_is_invalid_version() {
    let tc = TestCollection::new();
    tc.insert(json!({"_id": "a"}));
    let err = tc
        .update_by_id(
            &Value::from("a"),
            |_, _| Ok(Outcome::Keep),
            UpdateOptions::new().expect_version(""),
        )
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidVersion);
}

// ============================================================================
// Metadata
// ============================================================================

#[test]
fn metadata_survives_updates() {
    let tc = TestCollection::new();
    tc.insert_one(
        val(json!({"_id": "a", "n": 0})),
        InsertOptions::new().with_metadata(doc(json!({"owner": "ops", "tier.level": 2}))),
    )
    .unwrap();

    let record = tc
        .update_by_id(&Value::from("a"), increment("n", 1), UpdateOptions::new())
        .unwrap()
        .record
        .unwrap();
    assert_eq!(record.metadata, doc(json!({"owner": "ops", "tier.level": 2})));

    let record = tc
        .update_by_id(
            &Value::from("a"),
            |v, _| Ok(Outcome::PutWithMetadata(v, doc(json!({"owner": "dev"})))),
            UpdateOptions::new(),
        )
        .unwrap()
        .record
        .unwrap();
    assert_eq!(record.metadata, doc(json!({"owner": "dev"})));
    assert_eq!(tc.get("a").unwrap().metadata, doc(json!({"owner": "dev"})));
}
