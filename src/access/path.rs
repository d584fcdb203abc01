//! Field path resolution.
//!
//! A path is a dot-separated list of segments. Object segments select a key,
//! numeric segments index into an array, and the wildcard segment `#` fans out
//! across every element of an array. Elements that do not contain the rest of
//! the path are skipped during fan-out.

use thiserror::Error;

use super::value::Value;

/// Segment that expands across all elements of an array
pub const WILDCARD: &str = "#";

/// Errors that can occur while resolving a path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccessError {
    #[error("Empty field path")]
    EmptyPath,

    #[error("Key '{segment}' not found in path '{path}'")]
    MissingKey { segment: String, path: String },

    #[error("Index {segment} out of range in path '{path}'")]
    IndexOutOfRange { segment: String, path: String },

    #[error("Cannot read '{segment}' from a {found} value in path '{path}'")]
    NotAContainer {
        segment: String,
        found: &'static str,
        path: String,
    },
}

/// Result type for path resolution.
pub type AccessResult<T> = Result<T, AccessError>;

/// Read the value at `path` inside `record`
pub fn resolve(record: &Value, path: &str) -> AccessResult<Value> {
    if path.trim().is_empty() {
        return Err(AccessError::EmptyPath);
    }
    let segments: Vec<&str> = path.split('.').map(str::trim).collect();
    walk(record, &segments, path)
}

fn walk(current: &Value, segments: &[&str], path: &str) -> AccessResult<Value> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(current.clone());
    };

    if *segment == WILDCARD {
        let items = current.as_array().ok_or_else(|| AccessError::NotAContainer {
            segment: segment.to_string(),
            found: current.type_name(),
            path: path.to_string(),
        })?;
        let nested = rest.contains(&WILDCARD);
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match walk(item, rest, path) {
                Ok(Value::Array(inner)) if nested => out.extend(inner),
                Ok(value) => out.push(value),
                Err(_) => continue,
            }
        }
        return Ok(Value::Array(out));
    }

    let next = match current {
        Value::Object(map) => map.get(*segment).ok_or_else(|| AccessError::MissingKey {
            segment: segment.to_string(),
            path: path.to_string(),
        })?,
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index))
            .ok_or_else(|| AccessError::IndexOutOfRange {
                segment: segment.to_string(),
                path: path.to_string(),
            })?,
        other => {
            return Err(AccessError::NotAContainer {
                segment: segment.to_string(),
                found: other.type_name(),
                path: path.to_string(),
            })
        }
    };
    walk(next, rest, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Value {
        Value::from(json!({
            "patient": {"first_name": "John", "dob": "1989-04-19"},
            "items": [
                {"code": "A", "tags": ["x", "y"]},
                {"code": "B", "tags": ["z"]},
                {"name": "no code"}
            ],
            "matrix": [[1, 2], [3]]
        }))
    }

    #[test]
    fn test_dotted_path() {
        assert_eq!(resolve(&record(), "patient.first_name").unwrap(), Value::from("John"));
    }

    #[test]
    fn test_numeric_index() {
        assert_eq!(resolve(&record(), "items.1.code").unwrap(), Value::from("B"));
        assert!(matches!(
            resolve(&record(), "items.9.code"),
            Err(AccessError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_wildcard_skips_missing() {
        assert_eq!(
            resolve(&record(), "items.#.code").unwrap(),
            Value::from(vec!["A", "B"])
        );
    }

    #[test]
    fn test_wildcard_keeps_inner_sequences() {
        let tags = resolve(&record(), "items.#.tags").unwrap();
        assert_eq!(tags, Value::from(json!([["x", "y"], ["z"]])));
    }

    #[test]
    fn test_nested_wildcards_flatten() {
        assert_eq!(
            resolve(&record(), "items.#.tags.#").unwrap(),
            Value::from(vec!["x", "y", "z"])
        );
        assert_eq!(
            resolve(&record(), "matrix.#.#").unwrap(),
            Value::from(vec![1, 2, 3])
        );
    }

    #[test]
    fn test_missing_path() {
        assert!(matches!(
            resolve(&record(), "patient.last_name"),
            Err(AccessError::MissingKey { .. })
        ));
        assert!(matches!(
            resolve(&record(), "patient.first_name.x"),
            Err(AccessError::NotAContainer { found: "string", .. })
        ));
        assert_eq!(resolve(&record(), ""), Err(AccessError::EmptyPath));
    }
}
