//! Cross-type comparison of dynamically typed values.
//!
//! Ordering follows a small set of rules:
//!
//! - integers compare as integers, mixed numerics as floats
//! - a numeric operand pulls a numeric-looking string to a number
//! - if either string operand looks like a date, both sides are read as
//!   timestamps and compared chronologically
//! - remaining strings compare lexicographically
//!
//! [`try_compare`] reports incomparable operands as `None`; predicates use it
//! so that a type mismatch never matches. [`compare`] is the total variant
//! and folds incomparable pairs to `Equal`.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use super::datetime::{is_date_time, parse_time};
use super::value::{DataType, Value};

/// Three-way comparison, `None` when the operands are incomparable
pub fn try_compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) | (_, Value::Null) => None,

        (Value::String(s), _) if is_date_time(s) => chronological(left, right),
        (_, Value::String(s)) if is_date_time(s) => chronological(left, right),
        (Value::Timestamp(_), _) | (_, Value::Timestamp(_)) => chronological(left, right),

        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Int(_) | Value::Float(_), _) | (_, Value::Int(_) | Value::Float(_)) => {
            numeric(left, right)
        }

        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::Boolean(a), _) => right.coerce(DataType::Boolean)?.as_bool().map(|b| a.cmp(&b)),
        (Value::String(_), Value::Boolean(b)) => {
            left.coerce(DataType::Boolean)?.as_bool().map(|a| a.cmp(b))
        }

        _ => None,
    }
}

/// Total three-way comparison
///
/// Incomparable operands compare as `Equal`.
pub fn compare(left: &Value, right: &Value) -> Ordering {
    try_compare(left, right).unwrap_or(Ordering::Equal)
}

/// Equality between a field value and a literal
///
/// Strings compare case-insensitively. Any other field type pulls the literal
/// to its own type first; `None` means the literal could not be converted and
/// the comparison is undecidable. Null on either side is undecidable too.
pub fn equals(field: &Value, literal: &Value) -> Option<bool> {
    equality(field, literal, false)
}

/// [`equals`] with byte-exact string comparison
pub fn equals_cs(field: &Value, literal: &Value) -> Option<bool> {
    equality(field, literal, true)
}

fn equality(field: &Value, literal: &Value, case_sensitive: bool) -> Option<bool> {
    match (field, literal) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Timestamp(_), _) | (_, Value::Timestamp(_)) => {
            try_compare(field, literal).map(|o| o == Ordering::Equal)
        }
        (Value::String(a), _) => {
            let b = literal.coerce(DataType::String)?;
            b.as_str().map(|b| {
                if case_sensitive {
                    a == b
                } else {
                    a.to_lowercase() == b.to_lowercase()
                }
            })
        }
        (Value::Array(_) | Value::Object(_), _) => Some(field == literal),
        _ => {
            let data_type = field.data_type()?;
            literal.coerce(data_type).map(|converted| converted == *field)
        }
    }
}

/// Exact value equality after pulling `candidate` to `element`'s type
///
/// Used for set membership, where strings must match byte for byte.
pub fn same_value(element: &Value, candidate: &Value) -> bool {
    match element.data_type() {
        None => candidate.is_null(),
        Some(data_type) => candidate
            .coerce(data_type)
            .is_some_and(|converted| converted == *element),
    }
}

fn numeric(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Value::Int(a), Some(Value::Int(b))) = (left, right.coerce(DataType::Int)) {
        return Some(a.cmp(&b));
    }
    if let (Some(Value::Int(a)), Value::Int(b)) = (left.coerce(DataType::Int), right) {
        return Some(a.cmp(b));
    }
    match (as_number(left), as_number(right)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        // A non-numeric string against a number falls back to text order
        (None, Some(_)) => text_order(left, right),
        (Some(_), None) => text_order(left, right),
        (None, None) => None,
    }
}

fn text_order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), other) | (other, Value::String(a)) if !other.is_array() => {
            let b = other.to_string();
            if matches!(left, Value::String(_)) {
                Some(a.as_str().cmp(b.as_str()))
            } else {
                Some(b.as_str().cmp(a.as_str()))
            }
        }
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn chronological(left: &Value, right: &Value) -> Option<Ordering> {
    let a = timestamp_of(left)?;
    let b = timestamp_of(right)?;
    Some(a.cmp(&b))
}

fn timestamp_of(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Timestamp(t) => Some(*t),
        Value::String(s) => parse_time(s),
        Value::Int(secs) => DateTime::from_timestamp(*secs, 0),
        _ => None,
    }
}
