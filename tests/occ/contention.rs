//! Real-thread contention tests
//!
//! Threads race increments on one record. With a generous retry budget every
//! increment lands exactly once; with no retries, the final count equals the
//! number of calls that reported success.

use crate::common::*;
use slotdb::{NoRetry, RandomVersions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

fn shared_counter(max_attempts: usize) -> Arc<Collection<MemoryStore>> {
    init_tracing();
    let collection = Collection::builder(MemoryStore::new())
        .versions(RandomVersions)
        .retry(FixedDelay::immediate(max_attempts))
        .build();
    collection
        .insert_one(val(json!({"_id": "counter", "n": 0})), InsertOptions::new())
        .unwrap();
    Arc::new(collection)
}

fn count(collection: &Collection<MemoryStore>) -> i64 {
    collection
        .fetch_by_id(&Value::from("counter"))
        .unwrap()
        .value
        .get("n")
        .and_then(Value::as_int)
        .unwrap()
}

#[test]
fn no_lost_increments_under_contention() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 25;
    let collection = shared_counter(10_000);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let collection = Arc::clone(&collection);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..PER_THREAD {
                    collection
                        .update_by_id(&Value::from("counter"), increment("n", 1), UpdateOptions::new())
                        .unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(count(&collection), (THREADS * PER_THREAD) as i64);
}

#[test]
fn without_retries_successes_match_final_count() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 20;
    let collection = shared_counter(1);
    let barrier = Arc::new(Barrier::new(THREADS));
    let successes = Arc::new(AtomicUsize::new(0));
    let exhausted = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let collection = Arc::clone(&collection);
            let barrier = Arc::clone(&barrier);
            let successes = Arc::clone(&successes);
            let exhausted = Arc::clone(&exhausted);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..PER_THREAD {
                    match collection.update_by_id(
                        &Value::from("counter"),
                        increment("n", 1),
                        UpdateOptions::new().with_retry(NoRetry),
                    ) {
                        Ok(_) => successes.fetch_add(1, Ordering::SeqCst),
                        Err(e) => {
                            assert!(e.is_conflict_exhausted(), "unexpected error: {}", e);
                            exhausted.fetch_add(1, Ordering::SeqCst)
                        }
                    };
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let successes = successes.load(Ordering::SeqCst);
    assert_eq!(successes + exhausted.load(Ordering::SeqCst), THREADS * PER_THREAD);
    assert_eq!(count(&collection), successes as i64);
}

#[test]
fn racing_upserts_create_one_record() {
    const THREADS: usize = 6;
    let collection = Arc::new(
        Collection::builder(MemoryStore::new())
            .retry(FixedDelay::immediate(100))
            .build(),
    );
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let collection = Arc::clone(&collection);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                collection
                    .update_by_id(&Value::from("solo"), increment("hits", 1), UpdateOptions::upsert())
                    .unwrap();
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(collection.store().len(), 1);
    let record = collection.fetch_by_id(&Value::from("solo")).unwrap();
    assert_eq!(int_field(&record, "hits"), Some(THREADS as i64));
}
