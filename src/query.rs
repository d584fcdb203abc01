//! URL query-string front end.
//!
//! Accepted forms, one filter per distinct field:
//!
//! - `field=value`: equality
//! - `field=a&field=b`: membership in `[a, b]`
//! - `field:op=value`, `field=op:value` and `field:op:value`: `op` with `value`
//! - `field=isnull`, `field:null`: operators that take no value
//!
//! Values of `between`, `in` and `nin` are comma-separated lists.

use thiserror::Error;

use crate::access::Value;
use crate::condition::{Filter, FilterError, Operator};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("invalid percent-encoding in '{0}'")]
    Decode(String),

    #[error("operator {operator} on '{field}' needs at least one value")]
    EmptyList { field: String, operator: Operator },

    #[error("invalid filter on '{field}': {source}")]
    InvalidFilter {
        field: String,
        #[source]
        source: FilterError,
    },
}

pub type QueryResult<T> = Result<T, QueryError>;

/// Parse a query string into filters, skipping the fields in `except`
pub fn parse_query(qs: &str, except: &[&str]) -> QueryResult<Vec<Filter>> {
    let mut filters = Vec::new();

    for (key, values) in group_pairs(qs)? {
        let split = split_key(&key);
        let field = split.map_or(key.as_str(), |(field, _, _)| field);
        if except.contains(&field) {
            log::trace!("skipping excepted field {}", field);
            continue;
        }

        let filter = match split {
            Some((field, op, inline)) => {
                let text = inline.or_else(|| values.first().map(String::as_str));
                build(field, parse_operator(field, op)?, text.unwrap_or_default())?
            }
            None => from_values(field, &values)?,
        };
        filters.push(filter.with_key(key.as_str()));
    }

    log::debug!("parsed query string into {} filter(s)", filters.len());
    Ok(filters)
}

/// Decode `key=value` pairs, grouping repeated keys in order of first appearance
fn group_pairs(qs: &str) -> QueryResult<Vec<(String, Vec<String>)>> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();

    for pair in qs.trim_start_matches('?').split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode(key)?;
        let value = decode(value)?;
        match grouped.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => grouped.push((key, vec![value])),
        }
    }

    Ok(grouped)
}

fn decode(text: &str) -> QueryResult<String> {
    let spaced = text.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| QueryError::Decode(text.to_string()))
}

/// Split `field:op` or `field:op:value` keys
fn split_key(key: &str) -> Option<(&str, &str, Option<&str>)> {
    let mut parts = key.splitn(3, ':');
    let field = parts.next()?;
    let op = parts.next()?;
    Some((field, op, parts.next()))
}

fn parse_operator(field: &str, op: &str) -> QueryResult<Operator> {
    op.trim()
        .to_lowercase()
        .parse()
        .map_err(|source| QueryError::InvalidFilter {
            field: field.to_string(),
            source,
        })
}

/// Filter for a plain `field=...` key
fn from_values(field: &str, values: &[String]) -> QueryResult<Filter> {
    if values.len() > 1 {
        return build_with(field, Operator::In, Value::from(values.to_vec()));
    }

    let value = values.first().map(String::as_str).unwrap_or_default();
    if let Ok(operator) = value.to_lowercase().parse::<Operator>() {
        if !operator.requires_value() {
            return build(field, operator, "");
        }
    }

    match value.split_once(':') {
        Some((op, rest)) if looks_like_operator(op) => {
            build(field, parse_operator(field, op)?, rest)
        }
        _ => build(field, Operator::Equal, value),
    }
}

/// Operator names are plain words; anything else before a colon is data
fn looks_like_operator(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic() || c == '_')
}

fn build(field: &str, operator: Operator, text: &str) -> QueryResult<Filter> {
    let value = match operator {
        op if !op.requires_value() => Value::Null,
        Operator::Between | Operator::In | Operator::NotIn => {
            let items: Vec<Value> = text
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(Value::from)
                .collect();
            if items.is_empty() && operator != Operator::Between {
                return Err(QueryError::EmptyList {
                    field: field.to_string(),
                    operator,
                });
            }
            Value::Array(items)
        }
        _ => Value::from(text),
    };
    build_with(field, operator, value)
}

fn build_with(field: &str, operator: Operator, value: Value) -> QueryResult<Filter> {
    Filter::try_new(field, operator, value).map_err(|source| QueryError::InvalidFilter {
        field: field.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary(filters: &[Filter]) -> Vec<(String, Operator, Value)> {
        filters
            .iter()
            .map(|f| (f.field().to_string(), f.operator(), f.value().clone()))
            .collect()
    }

    #[test]
    fn test_equality_and_repeated_keys() {
        let filters = parse_query("?name=Jane+Doe&tag=a&tag=b&city=New%20York", &[]).unwrap();
        assert_eq!(
            summary(&filters),
            vec![
                ("name".to_string(), Operator::Equal, Value::from("Jane Doe")),
                ("tag".to_string(), Operator::In, Value::from(vec!["a", "b"])),
                ("city".to_string(), Operator::Equal, Value::from("New York")),
            ]
        );
        assert_eq!(filters[1].key(), Some("tag"));
    }

    #[test]
    fn test_operator_forms() {
        let filters = parse_query(
            "price:gt=100&age=between:18,30&status:in:open,pending&deleted_at=isnull&owner:nnull",
            &[],
        )
        .unwrap();
        assert_eq!(
            summary(&filters),
            vec![
                ("price".to_string(), Operator::GreaterThan, Value::from("100")),
                ("age".to_string(), Operator::Between, Value::from(vec!["18", "30"])),
                ("status".to_string(), Operator::In, Value::from(vec!["open", "pending"])),
                ("deleted_at".to_string(), Operator::IsNull, Value::Null),
                ("owner".to_string(), Operator::NotNull, Value::Null),
            ]
        );

        let record =
            Value::from(json!({"price": 150, "age": 30, "status": "open", "owner": "ops"}));
        assert!(filters.iter().all(|f| f.matches(&record)));
    }

    #[test]
    fn test_colon_in_plain_value() {
        let filters = parse_query("at=2023-01-01T10:00:00", &[]).unwrap();
        assert_eq!(filters[0].operator(), Operator::Equal);
        assert_eq!(filters[0].value(), &Value::from("2023-01-01T10:00:00"));
    }

    #[test]
    fn test_except_fields() {
        let filters =
            parse_query("page=2&limit=10&name=x&sort:eq=asc", &["page", "limit", "sort"]).unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].field(), "name");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse_query("price:bigger=1", &[]),
            Err(QueryError::InvalidFilter {
                source: FilterError::UnknownOperator(_),
                ..
            })
        ));
        assert!(matches!(
            parse_query("price=bigger:1", &[]),
            Err(QueryError::InvalidFilter { .. })
        ));
        assert!(matches!(
            parse_query("age=between:1,2,3", &[]),
            Err(QueryError::InvalidFilter {
                source: FilterError::BetweenArity(_),
                ..
            })
        ));
        assert!(matches!(
            parse_query("tag:in=", &[]),
            Err(QueryError::EmptyList { .. })
        ));
        assert!(matches!(parse_query("name=%E0%A4%A", &[]), Err(QueryError::Decode(_))));
    }

    #[test]
    fn test_empty_query() {
        assert!(parse_query("", &[]).unwrap().is_empty());
        assert!(parse_query("?", &[]).unwrap().is_empty());
    }
}
