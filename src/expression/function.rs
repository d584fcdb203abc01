//! Built-in and registered expression functions.
//!
//! Plain functions receive their already evaluated arguments. The predicate
//! functions (`filter`, `map`, `all`, `any`, `none`, `count`) need their second
//! argument unevaluated and are handled by the evaluator itself.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use super::error::{ExpressionError, ExpressionResult};
use super::eval::values_equal;
use crate::access::{parse_time, try_compare, Value};

/// A function callable from expressions
pub type Function = Arc<dyn Fn(&[Value]) -> ExpressionResult<Value> + Send + Sync>;

/// Names evaluated per element with `#` bound to the element
pub const PREDICATE_FUNCTIONS: &[&str] = &["filter", "map", "all", "any", "none", "count"];

static REGISTRY: LazyLock<RwLock<HashMap<String, Function>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Register a function under `name` for every expression evaluated afterwards
///
/// A registered function shadows a built-in of the same name.
pub fn register_function<F>(name: impl Into<String>, function: F)
where
    F: Fn(&[Value]) -> ExpressionResult<Value> + Send + Sync + 'static,
{
    let name = name.into();
    log::debug!("registering expression function {}", name);
    REGISTRY.write().insert(name, Arc::new(function));
}

/// Call the function `name` with evaluated arguments
pub fn call_function(name: &str, args: &[Value]) -> ExpressionResult<Value> {
    let registered = REGISTRY.read().get(name).cloned();
    if let Some(function) = registered {
        return function(args);
    }

    match name {
        "len" => {
            let [value] = arity::<1>(name, args)?;
            match value {
                Value::Null => Ok(Value::Int(0)),
                other => other
                    .len()
                    .map(Value::from)
                    .ok_or_else(|| invalid_argument(name, other)),
            }
        }
        "lower" => map_string(name, args, |s| s.to_lowercase()),
        "upper" => map_string(name, args, |s| s.to_uppercase()),
        "trim" => map_string(name, args, |s| s.trim().to_string()),
        "abs" => {
            let [value] = arity::<1>(name, args)?;
            match value {
                Value::Int(n) => n
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or_else(|| ExpressionError::evaluation("integer overflow in abs")),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(invalid_argument(name, other)),
            }
        }
        "sum" => {
            let [value] = arity::<1>(name, args)?;
            let items = value.as_array().ok_or_else(|| invalid_argument(name, value))?;
            sum(items)
        }
        "min" => extreme(name, args, Ordering::Less),
        "max" => extreme(name, args, Ordering::Greater),
        "contains" => {
            let [haystack, needle] = arity::<2>(name, args)?;
            let found = match haystack {
                Value::String(s) => s.contains(needle.to_string().as_str()),
                Value::Array(items) => items.iter().any(|item| values_equal(item, needle)),
                Value::Object(map) => map.contains_key(needle.to_string().as_str()),
                Value::Null => false,
                other => return Err(invalid_argument(name, other)),
            };
            Ok(Value::Boolean(found))
        }
        "startsWith" => {
            let [s, prefix] = string_pair(name, args)?;
            Ok(Value::Boolean(s.starts_with(prefix)))
        }
        "endsWith" => {
            let [s, suffix] = string_pair(name, args)?;
            Ok(Value::Boolean(s.ends_with(suffix)))
        }
        "intersect" => {
            let [left, right] = arity::<2>(name, args)?;
            let left = left.as_array().ok_or_else(|| invalid_argument(name, left))?;
            let right = right.as_array().ok_or_else(|| invalid_argument(name, right))?;
            Ok(Value::Array(
                left.iter()
                    .filter(|item| right.iter().any(|other| values_equal(item, other)))
                    .cloned()
                    .collect(),
            ))
        }
        "now" => {
            arity::<0>(name, args)?;
            Ok(Value::Timestamp(Utc::now()))
        }
        "date" => {
            let [value] = arity::<1>(name, args)?;
            match value {
                Value::Timestamp(_) => Ok(value.clone()),
                Value::String(s) => parse_time(s).map(Value::Timestamp).ok_or_else(|| {
                    ExpressionError::evaluation(format!("cannot parse date '{}'", s))
                }),
                Value::Int(secs) => DateTime::from_timestamp(*secs, 0)
                    .map(Value::Timestamp)
                    .ok_or_else(|| invalid_argument(name, value)),
                other => Err(invalid_argument(name, other)),
            }
        }
        _ => Err(ExpressionError::UnknownFunction {
            name: name.to_string(),
        }),
    }
}

fn arity<'a, const N: usize>(name: &str, args: &'a [Value]) -> ExpressionResult<[&'a Value; N]> {
    if args.len() != N {
        return Err(ExpressionError::FunctionArgumentCount {
            function: name.to_string(),
            expected: N,
            actual: args.len(),
        });
    }
    Ok(std::array::from_fn(|i| &args[i]))
}

fn invalid_argument(name: &str, value: &Value) -> ExpressionError {
    ExpressionError::InvalidOperandTypes {
        operator: name.to_string(),
        left_type: value.data_type(),
        right_type: None,
    }
}

fn map_string(name: &str, args: &[Value], f: impl Fn(&str) -> String) -> ExpressionResult<Value> {
    let [value] = arity::<1>(name, args)?;
    value
        .as_str()
        .map(|s| Value::String(f(s)))
        .ok_or_else(|| invalid_argument(name, value))
}

fn string_pair<'a>(name: &str, args: &'a [Value]) -> ExpressionResult<[&'a str; 2]> {
    let [left, right] = arity::<2>(name, args)?;
    match (left.as_str(), right.as_str()) {
        (Some(l), Some(r)) => Ok([l, r]),
        _ => Err(ExpressionError::InvalidOperandTypes {
            operator: name.to_string(),
            left_type: left.data_type(),
            right_type: right.data_type(),
        }),
    }
}

fn sum(items: &[Value]) -> ExpressionResult<Value> {
    let mut int_total: i64 = 0;
    let mut float_total: f64 = 0.0;
    let mut is_float = false;

    for item in items {
        match item {
            Value::Int(n) if !is_float => {
                int_total = int_total
                    .checked_add(*n)
                    .ok_or_else(|| ExpressionError::evaluation("integer overflow in sum"))?;
            }
            Value::Int(n) => float_total += *n as f64,
            Value::Float(f) => {
                if !is_float {
                    is_float = true;
                    float_total = int_total as f64;
                }
                float_total += f;
            }
            other => return Err(invalid_argument("sum", other)),
        }
    }

    Ok(if is_float {
        Value::Float(float_total)
    } else {
        Value::Int(int_total)
    })
}

fn extreme(name: &str, args: &[Value], wanted: Ordering) -> ExpressionResult<Value> {
    let items = match args {
        [] => {
            return Err(ExpressionError::FunctionArgumentCount {
                function: name.to_string(),
                expected: 1,
                actual: 0,
            })
        }
        [Value::Array(items)] => items.as_slice(),
        _ => args,
    };

    let mut best: Option<&Value> = None;
    for item in items {
        best = match best {
            None => Some(item),
            Some(current) => match try_compare(item, current) {
                Some(ordering) if ordering == wanted => Some(item),
                Some(_) => Some(current),
                None => {
                    return Err(ExpressionError::InvalidOperandTypes {
                        operator: name.to_string(),
                        left_type: item.data_type(),
                        right_type: current.data_type(),
                    })
                }
            },
        };
    }
    Ok(best.cloned().unwrap_or(Value::Null))
}
