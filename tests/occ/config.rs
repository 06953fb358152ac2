//! Configuration tests
//!
//! Collections opened from `slotdb.toml` pick up layout, read strictness and
//! the default retry budget.

use crate::common::*;
use slotdb::{CollectionConfig, CONFIG_FILE_NAME};
use std::cell::Cell;
use tempfile::TempDir;

fn open(toml: &str) -> (TempDir, Collection<MemoryStore>) {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, toml).unwrap();
    let collection = Collection::open_with_config_file(MemoryStore::new(), &path).unwrap();
    (dir, collection)
}

#[test]
fn default_file_opens_default_collection() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    CollectionConfig::write_default_if_missing(&path).unwrap();
    let c = Collection::open_with_config_file(MemoryStore::new(), &path).unwrap();
    assert_eq!(c.layout(), Layout::Segregated);
    assert_eq!(c.find_one(&doc(json!({"x": 1}))).unwrap(), None);
}

#[test]
fn layout_from_file() {
    let (_dir, c) = open("layout = \"embedded\"\n");
    assert_eq!(c.layout(), Layout::Embedded);
    c.insert_one(val(json!({"_id": "a", "n": 1})), InsertOptions::new())
        .unwrap();
    assert!(c.store().documents()[0].contains_key("n"));
}

#[test]
fn strict_reads_from_file() {
    let (_dir, c) = open("strict_reads = true\n");
    let err = c.find_one(&doc(json!({"x": 1}))).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoSuchEntity);
}

#[test]
fn retry_budget_from_file() {
    let (_dir, c) = open("[retry]\nmax_attempts = 2\ndelay_ms = 0\n");
    c.insert_one(val(json!({"_id": "a", "n": 0})), InsertOptions::new())
        .unwrap();

    let attempts = Cell::new(0);
    let err = c
        .update_by_id(
            &Value::from("a"),
            |v, _| {
                attempts.set(attempts.get() + 1);
                // a competing write lands before ours every time
                c.update_by_id(&Value::from("a"), increment("n", 1), UpdateOptions::new())?;
                Ok(Outcome::Put(v))
            },
            UpdateOptions::new(),
        )
        .unwrap_err();
    assert!(matches!(err, SlotError::ExhaustedRetries { attempts: 2, .. }));
    assert_eq!(attempts.get(), 2);
}

#[test]
fn invalid_file_is_invalid_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "layout = 7\n").unwrap();
    let err = Collection::open_with_config_file(MemoryStore::new(), &path)
        .err()
        .expect("bad config");
    assert_eq!(err.code(), ErrorCode::InvalidConfig);
}
