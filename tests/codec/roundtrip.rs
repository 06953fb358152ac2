//! Encode/decode round trips
//!
//! `decode(encode(v)) == v` for every storable value, through the bare value
//! codec, both record layouts and a real store.

use crate::common::*;
use crate::strategies::{logical_value, metadata, nested};
use proptest::prelude::*;
use slotdb::{decode_value, encode_value, Metadata, VersionToken};

fn record(value: Value, metadata: Metadata) -> Record {
    Record {
        id: value.get("_id").cloned().unwrap_or(Value::Null),
        value,
        created_at: Timestamp::from_millis(1),
        updated_at: Timestamp::from_millis(2),
        version: VersionToken::random(),
        metadata,
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn value_codec_roundtrip(v in nested()) {
        prop_assert_eq!(decode_value(&encode_value(&v)), v);
    }

    #[test]
    fn segregated_record_roundtrip(v in logical_value(), m in metadata()) {
        let original = record(v, m);
        let stored = Layout::Segregated.encode(&original);
        for key in stored.keys() {
            prop_assert!(!key.contains('$'));
        }
        prop_assert_eq!(Layout::Segregated.decode(&stored).unwrap(), original);
    }

    #[test]
    fn embedded_record_roundtrip(v in logical_value(), m in metadata()) {
        let mut original = record(v, m);
        Layout::Embedded.attach_bookkeeping(&mut original);
        let stored = Layout::Embedded.encode(&original);
        prop_assert_eq!(Layout::Embedded.decode(&stored).unwrap(), original);
    }

    #[test]
    fn collection_roundtrip(v in logical_value()) {
        let tc = TestCollection::new();
        tc.insert_one(v.clone(), InsertOptions::new()).unwrap();
        let id = v.get("_id").cloned().unwrap();
        let found = tc.find_by_id(&id).unwrap().unwrap();
        prop_assert_eq!(found.value, v);
    }
}

#[test]
fn nested_arrays_of_reserved_keys() {
    let v = val(json!({
        "_id": "x",
        "list": [{"a.b": 1}, [{"$c": {"d%": 2}}], "plain"]
    }));
    let encoded = encode_value(&v);
    let list = encoded.get("list").unwrap().as_array().unwrap();
    assert_eq!(list[0].get("a%2Eb"), Some(&Value::Int(1)));
    assert_eq!(decode_value(&encoded), v);
}
