//! Deterministic interleaving tests
//!
//! A primary updater is paused between its READ and its WRITE while other
//! writers run to completion. Its write must then miss, and the retry must
//! see the other writers' committed values (no lost updates).

use crate::common::*;
use slotdb_concurrency::testing::run_interleaved;
use std::time::Duration;

fn primary_times_ten(
    tc: &TestCollection,
    gate: &slotdb_concurrency::testing::PrimaryGate,
) -> SlotResult<Mutation> {
    tc.update_by_id(
        &Value::from("a"),
        |v, _| {
            gate.around(|| {
                let n = v.get("n").and_then(Value::as_int).unwrap_or(0);
                let mut v = v;
                v.as_object_mut()
                    .expect("objects")
                    .insert("n".to_string(), Value::Int(n * 10));
                Ok(Outcome::Put(v))
            })
        },
        UpdateOptions::new(),
    )
}

#[test]
fn stale_write_retries_against_winner() {
    let tc = TestCollection::new();
    tc.insert(json!({"_id": "a", "n": 1}));

    let out = run_interleaved(
        |gate| primary_times_ten(&tc, gate),
        vec![|| tc.update_by_id(&Value::from("a"), increment("n", 1), UpdateOptions::new())],
    );

    assert_eq!(out.interleaved, 1);
    assert!(out.others[0].is_ok());
    let record = out.primary.unwrap().record.unwrap();
    // (1 + 1) * 10: A re-applied to B's committed value
    assert_eq!(int_field(&record, "n"), Some(20));
    assert_eq!(tc.get("a").unwrap(), record);
}

#[test]
fn two_interleaved_writers_within_budget() {
    let tc = TestCollection::new();
    tc.insert(json!({"_id": "a", "n": 1}));

    let others: Vec<_> = (0..2)
        .map(|_| || tc.update_by_id(&Value::from("a"), increment("n", 1), UpdateOptions::new()))
        .collect();
    let out = run_interleaved(|gate| primary_times_ten(&tc, gate), others);

    assert_eq!(out.interleaved, 2);
    let record = out.primary.unwrap().record.unwrap();
    assert_eq!(int_field(&record, "n"), Some(30));
}

#[test]
fn four_writers_exhaust_budget_of_three() {
    let tc = TestCollection::new();
    tc.insert(json!({"_id": "a", "n": 0}));

    let others: Vec<_> = (1..=3)
        .map(|i| {
            let tc = &tc;
            move || tc.update_by_id(&Value::from("a"), set_field("n", Value::Int(i)), UpdateOptions::new())
        })
        .collect();
    let out = run_interleaved(|gate| primary_times_ten(&tc, gate), others);

    let err = out.primary.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ExhaustedRetries);
    assert!(matches!(err, SlotError::ExhaustedRetries { attempts: 3, .. }));
    assert_eq!(out.interleaved, 3);
    assert!(out.others.iter().all(|r| r.is_ok()));

    // The last writer did not need a retry, so its value landed
    assert_eq!(int_field(&tc.get("a").unwrap(), "n"), Some(3));
}

#[test]
fn primary_exhaustion_respects_per_call_policy() {
    let tc = TestCollection::new();
    tc.insert(json!({"_id": "a", "n": 0}));

    let others: Vec<_> = (1..=3)
        .map(|i| {
            let tc = &tc;
            move || tc.update_by_id(&Value::from("a"), set_field("n", Value::Int(i)), UpdateOptions::new())
        })
        .collect();
    let out = run_interleaved(
        |gate| {
            tc.update_by_id(
                &Value::from("a"),
                |v, _| gate.around(|| Ok(Outcome::Put(v))),
                UpdateOptions::new().with_retry(FixedDelay::immediate(10)),
            )
        },
        others,
    );

    // Three conflicts, then a clean fourth attempt
    assert!(out.primary.is_ok());
    assert_eq!(out.interleaved, 3);
    assert_eq!(int_field(&tc.get("a").unwrap(), "n"), Some(3));
}

#[test]
fn upsert_race_turns_into_update() {
    let tc = TestCollection::new();

    let out = run_interleaved(
        |gate| {
            tc.update_by_id(
                &Value::from("fresh"),
                |mut v, _| {
                    gate.around(|| {
                        v.as_object_mut()
                            .expect("objects")
                            .insert("by".to_string(), Value::from("primary"));
                        Ok(Outcome::Put(v))
                    })
                },
                UpdateOptions::upsert(),
            )
        },
        vec![|| tc.insert_one(val(json!({"_id": "fresh", "n": 5})), InsertOptions::new())],
    );

    assert!(out.others[0].is_ok());
    let record = out.primary.unwrap().record.unwrap();
    // The primary's insert hit a duplicate id, re-read, and updated instead
    assert_eq!(
        record.value,
        val(json!({"_id": "fresh", "n": 5, "by": "primary"}))
    );
    assert_eq!(tc.store().len(), 1);
}

#[test]
fn upsert_race_never_moves_updated_at_behind_created_at() {
    let tc = TestCollection::new();

    let out = run_interleaved(
        |gate| {
            tc.update_by_id(
                &Value::from("fresh"),
                |v, _| gate.around(|| Ok(Outcome::Put(v))),
                UpdateOptions::upsert(),
            )
        },
        vec![|| {
            // The other writer runs later than the primary's clock reading
            tc.clock.advance(Duration::from_secs(5));
            tc.insert_one_record(val(json!({"_id": "fresh"})), InsertOptions::new())
        }],
    );

    let inserted = out.others[0].as_ref().unwrap().record.clone().unwrap();
    let record = out.primary.unwrap().record.unwrap();
    assert_eq!(record.created_at, inserted.created_at);
    assert!(record.updated_at >= record.created_at);
    assert!(record.updated_at >= inserted.updated_at);
    assert_ne!(record.version, inserted.version);
    assert_eq!(tc.get("fresh").unwrap(), record);
}

#[test]
fn delete_outcome_retries_against_new_version() {
    let tc = TestCollection::new();
    tc.insert(json!({"_id": "a", "n": 0}));

    let out = run_interleaved(
        |gate| {
            tc.update_by_id(
                &Value::from("a"),
                |_, _| gate.around(|| Ok(Outcome::Delete)),
                UpdateOptions::new(),
            )
        },
        vec![|| tc.update_by_id(&Value::from("a"), increment("n", 7), UpdateOptions::new())],
    );

    let m = out.primary.unwrap();
    assert_eq!(m.result.deleted_count, 1);
    // The deleted envelope is the one the retry saw
    assert_eq!(int_field(&m.record.unwrap(), "n"), Some(7));
    assert!(tc.store().is_empty());
}
