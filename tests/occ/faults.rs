//! Store failure tests
//!
//! Only "replace matched nothing", "delete matched nothing" and "duplicate
//! _id on upsert" are conflicts. Every other store error surfaces at once as
//! UNEXPECTED_ERROR with the store error as its source.

use crate::common::*;
use slotdb::StoreError;
use slotdb_storage::testing::{FaultyStore, StoreOp};
use std::error::Error as _;

fn faulty() -> Collection<FaultyStore<MemoryStore>> {
    init_tracing();
    Collection::builder(FaultyStore::new(MemoryStore::new()))
        .versions(CounterVersions::new())
        .retry(FixedDelay::immediate(5))
        .build()
}

fn backend(msg: &str) -> StoreError {
    StoreError::Backend(msg.to_string())
}

#[test]
fn replace_error_is_unexpected_with_cause() {
    let c = faulty();
    c.insert_one(val(json!({"_id": "a", "n": 0})), InsertOptions::new())
        .unwrap();
    c.store().fail_next(StoreOp::ReplaceOne, backend("replace exploded"));

    let err = c
        .update_by_id(&Value::from("a"), increment("n", 1), UpdateOptions::new())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnexpectedError);
    let cause = err.source().expect("store error is kept as the cause");
    assert!(cause.to_string().contains("replace exploded"));
    assert_eq!(c.store().calls(StoreOp::ReplaceOne), 1);

    // Nothing was written
    let record = c.fetch_by_id(&Value::from("a")).unwrap();
    assert_eq!(int_field(&record, "n"), Some(0));
}

#[test]
fn read_error_is_unexpected() {
    let c = faulty();
    c.store().fail_next(StoreOp::FindOne, backend("read failed"));
    let err = c.find_by_id(&Value::from("a")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnexpectedError);

    c.store().fail_next(StoreOp::FindOne, backend("read failed"));
    let err = c
        .update_by_id(&Value::from("a"), increment("n", 1), UpdateOptions::upsert())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnexpectedError);
    assert_eq!(c.store().calls(StoreOp::InsertOne), 0);
}

#[test]
fn cursor_error_is_unexpected() {
    let c = faulty();
    c.store().fail_next(StoreOp::Find, backend("no cursor"));
    let err = c.find(&doc(json!({}))).err().expect("find fails");
    assert_eq!(err.code(), ErrorCode::UnexpectedError);
}

#[test]
fn delete_error_is_unexpected() {
    let c = faulty();
    c.insert_one(val(json!({"_id": "a"})), InsertOptions::new())
        .unwrap();
    c.store().fail_always(StoreOp::DeleteOne, backend("delete failed"));
    let err = c
        .delete_by_id(&Value::from("a"), DeleteOptions::new())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnexpectedError);
    assert_eq!(c.store().calls(StoreOp::DeleteOne), 1);
}

#[test]
fn duplicate_id_on_upsert_is_a_conflict() {
    let c = faulty();
    c.store().fail_next(
        StoreOp::InsertOne,
        StoreError::DuplicateKey {
            index: slotdb::ID_INDEX.to_string(),
            key: "\"a\"".to_string(),
        },
    );

    // The injected duplicate looks like a lost race; the retry re-reads,
    // still finds nothing, and inserts for real
    let m = c
        .update_by_id(&Value::from("a"), increment("n", 1), UpdateOptions::upsert())
        .unwrap();
    assert_eq!(int_field(&m.record.unwrap(), "n"), Some(1));
    assert_eq!(c.store().calls(StoreOp::InsertOne), 2);
    assert_eq!(c.store().calls(StoreOp::FindOne), 2);
}

#[test]
fn secondary_duplicate_on_upsert_is_unexpected() {
    let c = faulty();
    c.store().fail_next(
        StoreOp::InsertOne,
        StoreError::DuplicateKey {
            index: "v_email_1".to_string(),
            key: "\"a@x\"".to_string(),
        },
    );
    let err = c
        .update_by_id(&Value::from("a"), set_field("email", Value::from("a@x")), UpdateOptions::upsert())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnexpectedError);
    assert_eq!(c.store().calls(StoreOp::InsertOne), 1);
}

#[test]
fn duplicate_on_plain_insert_is_unexpected() {
    let c = faulty();
    c.insert_one(val(json!({"_id": "a"})), InsertOptions::new())
        .unwrap();
    let err = c
        .insert_one(val(json!({"_id": "a"})), InsertOptions::new())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnexpectedError);
}

#[test]
fn unsupported_index_is_unexpected() {
    let c = faulty();
    c.store().fail_next(StoreOp::CreateIndex, StoreError::Unsupported("indexes".into()));
    let err = c.create_index(&doc(json!({"email": 1})), true).unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnexpectedError);
}
