use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use super::datetime::parse_time;

/// Kinds of values a record field can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    Int,
    Float,
    String,
    Timestamp,
    Array,
    Object,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::Timestamp => "timestamp",
            DataType::Array => "array",
            DataType::Object => "object",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values that records, literals and expressions are made of
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Get the data type of this value
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Int(_) => Some(DataType::Int),
            Value::Float(_) => Some(DataType::Float),
            Value::String(_) => Some(DataType::String),
            Value::Timestamp(_) => Some(DataType::Timestamp),
            Value::Array(_) => Some(DataType::Array),
            Value::Object(_) => Some(DataType::Object),
        }
    }

    /// Name of the value's kind, `"null"` included
    pub fn type_name(&self) -> &'static str {
        self.data_type().map_or("null", |t| t.as_str())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of ints and floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Member lookup on objects
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Length of strings (in chars), arrays and objects
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.len()),
            Value::Object(map) => Some(map.len()),
            _ => None,
        }
    }

    /// Whether the value is its type's zero value
    ///
    /// Null, `false`, `0`, `0.0`, the empty string, empty containers and the
    /// Unix epoch are zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(b) => !b,
            Value::Int(n) => *n == 0,
            Value::Float(f) => *f == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Timestamp(t) => t.timestamp() == 0 && t.timestamp_subsec_nanos() == 0,
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
        }
    }

    /// Truthiness used by boolean contexts in expressions
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            _ => true,
        }
    }

    /// Flatten nested arrays into a single sequence of non-array values
    pub fn flatten(&self) -> Vec<&Value> {
        let mut out = Vec::new();
        flatten_into(self, &mut out);
        out
    }

    /// Convert this value to `data_type`, returning `None` when the conversion
    /// is not meaningful.
    pub fn coerce(&self, data_type: DataType) -> Option<Value> {
        match (self, data_type) {
            (Value::Null, _) => None,

            (Value::Int(_), DataType::Int) => Some(self.clone()),
            (Value::Float(f), DataType::Int) => {
                (f.fract() == 0.0 && f.is_finite()).then_some(Value::Int(*f as i64))
            }
            (Value::String(s), DataType::Int) => {
                let s = s.trim();
                s.parse::<i64>().ok().map(Value::Int).or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.fract() == 0.0 && f.is_finite())
                        .map(|f| Value::Int(f as i64))
                })
            }

            (Value::Int(n), DataType::Float) => Some(Value::Float(*n as f64)),
            (Value::Float(_), DataType::Float) => Some(self.clone()),
            (Value::String(s), DataType::Float) => s.trim().parse::<f64>().ok().map(Value::Float),

            (Value::Boolean(_), DataType::Boolean) => Some(self.clone()),
            (Value::String(s), DataType::Boolean) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => Some(Value::Boolean(true)),
                "false" | "f" | "0" | "no" => Some(Value::Boolean(false)),
                _ => None,
            },

            (Value::String(_), DataType::String) => Some(self.clone()),
            (
                Value::Boolean(_) | Value::Int(_) | Value::Float(_) | Value::Timestamp(_),
                DataType::String,
            ) => Some(Value::String(self.to_string())),

            (Value::Timestamp(_), DataType::Timestamp) => Some(self.clone()),
            (Value::String(s), DataType::Timestamp) => parse_time(s).map(Value::Timestamp),
            (Value::Int(secs), DataType::Timestamp) => {
                DateTime::from_timestamp(*secs, 0).map(Value::Timestamp)
            }

            (Value::Array(_), DataType::Array) => Some(self.clone()),
            (_, DataType::Array) => Some(Value::Array(vec![self.clone()])),

            (Value::Object(_), DataType::Object) => Some(self.clone()),

            _ => None,
        }
    }
}

fn flatten_into<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| flatten_into(item, out)),
        other => out.push(other),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
            Value::Timestamp(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Array(_) | Value::Object(_) => {
                write!(f, "{}", serde_json::Value::from(self))
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Timestamp(_) => serde_json::Value::String(value.to_string()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Value::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Value::Object(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_conversion() {
        let value = Value::from(json!({
            "name": "laptop",
            "price": 150,
            "ratio": 0.5,
            "tags": ["a", "b"],
            "deleted_at": null
        }));

        assert_eq!(value.get("name"), Some(&Value::from("laptop")));
        assert_eq!(value.get("price"), Some(&Value::Int(150)));
        assert_eq!(value.get("ratio"), Some(&Value::Float(0.5)));
        assert_eq!(value.get("tags").and_then(Value::len), Some(2));
        assert_eq!(value.get("deleted_at"), Some(&Value::Null));

        let back = serde_json::Value::from(&value);
        assert_eq!(back["tags"][1], json!("b"));
    }

    #[test]
    fn test_coerce() {
        assert_eq!(Value::from("42").coerce(DataType::Int), Some(Value::Int(42)));
        assert_eq!(Value::from("4.0").coerce(DataType::Int), Some(Value::Int(4)));
        assert_eq!(Value::from("4.5").coerce(DataType::Int), None);
        assert_eq!(Value::Int(3).coerce(DataType::Float), Some(Value::Float(3.0)));
        assert_eq!(Value::from("TRUE").coerce(DataType::Boolean), Some(Value::Boolean(true)));
        assert_eq!(Value::from("maybe").coerce(DataType::Boolean), None);
        assert_eq!(Value::Int(7).coerce(DataType::String), Some(Value::from("7")));
        assert_eq!(Value::Null.coerce(DataType::String), None);
        assert_eq!(
            Value::from("x").coerce(DataType::Array),
            Some(Value::Array(vec![Value::from("x")]))
        );
        assert!(matches!(
            Value::from("2023-01-01").coerce(DataType::Timestamp),
            Some(Value::Timestamp(_))
        ));
    }

    #[test]
    fn test_zero_values() {
        assert!(Value::Null.is_zero());
        assert!(Value::Int(0).is_zero());
        assert!(Value::from("").is_zero());
        assert!(Value::Array(vec![]).is_zero());
        assert!(!Value::Int(85).is_zero());
        assert!(!Value::Boolean(true).is_zero());
    }

    #[test]
    fn test_flatten() {
        let value = Value::from(json!([["a", "b"], "c", [["d"]]]));
        let flat: Vec<String> = value.flatten().iter().map(|v| v.to_string()).collect();
        assert_eq!(flat, vec!["a", "b", "c", "d"]);
    }
}
