//! Filter evaluation for the in-memory store
//!
//! Supports the subset of the document filter language the engine and its
//! callers use:
//!
//! - literal equality, with array fields matching when any element is equal
//! - `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$exists`, `$not`
//! - top-level `$and`, `$or`, `$nor`
//! - dotted paths, fanning out over arrays of objects
//!
//! Ordering operators only compare values of the same kind (numbers with
//! numbers, strings with strings); mixed kinds never match.

use std::cmp::Ordering;

use slotdb_core::path::{is_operator, split_path};
use slotdb_core::{Document, Value};

use crate::error::{StoreError, StoreResult};

/// Check whether `doc` satisfies `filter`
///
/// # Errors
///
/// Returns [`StoreError::Unsupported`] for operators outside the supported set.
pub fn matches(doc: &Document, filter: &Document) -> StoreResult<bool> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => all_clauses(doc, condition)?,
            "$or" => any_clause(doc, condition)?,
            "$nor" => !any_clause(doc, condition)?,
            op if is_operator(op) => {
                return Err(StoreError::Unsupported(format!("top-level operator {}", op)))
            }
            path => {
                let segments: Vec<&str> = split_path(path).collect();
                let mut candidates = Vec::new();
                collect_doc(doc, &segments, &mut candidates);
                field_matches(&candidates, condition)?
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses(condition: &Value) -> StoreResult<&[Value]> {
    condition
        .as_array()
        .ok_or_else(|| StoreError::Backend("logical operator needs an array".to_string()))
}

fn clause_matches(doc: &Document, clause: &Value) -> StoreResult<bool> {
    match clause {
        Value::Object(sub) => matches(doc, sub),
        _ => Err(StoreError::Backend(
            "logical operator clauses must be objects".to_string(),
        )),
    }
}

fn all_clauses(doc: &Document, condition: &Value) -> StoreResult<bool> {
    for clause in clauses(condition)? {
        if !clause_matches(doc, clause)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_clause(doc: &Document, condition: &Value) -> StoreResult<bool> {
    for clause in clauses(condition)? {
        if clause_matches(doc, clause)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn collect_doc<'a>(doc: &'a Document, segments: &[&str], out: &mut Vec<&'a Value>) {
    if let Some((first, rest)) = segments.split_first() {
        if let Some(v) = doc.get(*first) {
            collect(v, rest, out);
        }
    }
}

fn collect<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    let (first, rest) = match segments.split_first() {
        Some(split) => split,
        None => {
            out.push(value);
            return;
        }
    };
    match value {
        Value::Object(obj) => {
            if let Some(v) = obj.get(*first) {
                collect(v, rest, out);
            }
        }
        Value::Array(items) => {
            if let Ok(index) = first.parse::<usize>() {
                if let Some(v) = items.get(index) {
                    collect(v, rest, out);
                }
            }
            for item in items {
                if item.is_object() {
                    collect(item, segments, out);
                }
            }
        }
        _ => {}
    }
}

fn field_matches(candidates: &[&Value], condition: &Value) -> StoreResult<bool> {
    match condition {
        Value::Object(ops) if ops.keys().any(|k| is_operator(k)) => {
            for (op, operand) in ops {
                if !operator_matches(candidates, op, operand)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        literal => Ok(equals_any(candidates, literal)),
    }
}

fn operator_matches(candidates: &[&Value], op: &str, operand: &Value) -> StoreResult<bool> {
    let result = match op {
        "$eq" => equals_any(candidates, operand),
        "$ne" => !equals_any(candidates, operand),
        "$gt" => compares_any(candidates, operand, |o| o == Ordering::Greater),
        "$gte" => compares_any(candidates, operand, |o| o != Ordering::Less),
        "$lt" => compares_any(candidates, operand, |o| o == Ordering::Less),
        "$lte" => compares_any(candidates, operand, |o| o != Ordering::Greater),
        "$in" => in_list(candidates, operand)?,
        "$nin" => !in_list(candidates, operand)?,
        "$exists" => {
            let wanted = operand.as_bool().unwrap_or(true);
            candidates.is_empty() != wanted
        }
        "$not" => !field_matches(candidates, operand)?,
        other => return Err(StoreError::Unsupported(format!("operator {}", other))),
    };
    Ok(result)
}

fn in_list(candidates: &[&Value], operand: &Value) -> StoreResult<bool> {
    let list = operand
        .as_array()
        .ok_or_else(|| StoreError::Backend("$in/$nin need an array".to_string()))?;
    Ok(list.iter().any(|v| equals_any(candidates, v)))
}

fn equals_any(candidates: &[&Value], literal: &Value) -> bool {
    if candidates.is_empty() {
        return literal.is_null();
    }
    candidates.iter().any(|c| {
        *c == literal
            || match c {
                Value::Array(items) => items.iter().any(|item| item == literal),
                _ => false,
            }
    })
}

fn compares_any(candidates: &[&Value], operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    candidates.iter().any(|c| {
        let direct = compare(c, operand).map_or(false, &accept);
        direct
            || match c {
                Value::Array(items) => items
                    .iter()
                    .any(|item| compare(item, operand).map_or(false, &accept)),
                _ => false,
            }
    })
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Id(x), Value::Id(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
