//! Upsert projector
//!
//! When an upserting update finds no record, the transform still needs a
//! starting value. [`project_upsert_default`] derives one from the filter that
//! produced the miss, so the value the transform sees obeys the filter's
//! equality constraints.
//!
//! Walks the filter's top-level pairs:
//! - a literal (scalar, array, or object without operator keys) is assigned at
//!   its dotted path
//! - an operator object containing `$eq` contributes the `$eq` operand
//! - any other operator object (`$in`, `$gt`, `$exists`, ...) is skipped
//! - top-level operator keys (`$and`, `$or`, ...) are skipped

use crate::path::{has_operator_keys, is_operator, set_path};
use crate::value::{Document, Value};

/// Derive a default logical value from a query filter
pub fn project_upsert_default(filter: &Document) -> Value {
    let mut result = Document::new();

    for (key, value) in filter {
        if is_operator(key) {
            continue;
        }

        let literal = match value {
            Value::Object(obj) if has_operator_keys(obj) => match obj.get("$eq") {
                Some(operand) => operand,
                None => continue,
            },
            other => other,
        };

        set_path(&mut result, key, literal.clone());
    }

    Value::Object(result)
}
