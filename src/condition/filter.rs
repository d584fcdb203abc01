//! Leaf predicates.
//!
//! A [`Filter`] compares one field of a record against a literal. The literal
//! can be a `{{expr}}` template evaluated against the same record, and a
//! [`Lookup`] can replace it with a secondary dataset.
//!
//! Filters are validated once, at construction. An invalid filter never
//! matches, negated or not. Evaluation failures (unresolvable paths, type
//! mismatches, lookup handler errors) are logged at debug level and count as
//! a raw `false`, which negation then flips like any other outcome.

use anyhow::{anyhow, bail, Context};
use log::{debug, trace};
use regex::Regex;
use std::cmp::Ordering;

use super::error::{FilterError, FilterResult};
use super::lookup::Lookup;
use super::operator::{Operator, StringMatch};
use crate::access::{equals, equals_cs, resolve, same_value, try_compare, Value};
use crate::expression::{self, is_template, render, resolve_literal, template_source, Expression};

/// Artifacts prepared at validation time
#[derive(Debug, Clone)]
enum Compiled {
    Nothing,
    Pattern(Regex),
    Expression(Expression),
}

#[derive(Debug, Clone)]
pub struct Filter {
    key: Option<String>,
    field: String,
    operator: Operator,
    value: Value,
    negate: bool,
    lookup: Option<Lookup>,
    compiled: Result<Compiled, FilterError>,
}

impl Filter {
    /// Create a filter; validation problems surface through [`Filter::validate`]
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        let mut filter = Filter {
            key: None,
            field: field.into(),
            operator,
            value: value.into(),
            negate: false,
            lookup: None,
            compiled: Ok(Compiled::Nothing),
        };
        filter.compiled = filter.compile();
        filter
    }

    /// Create a filter, failing if it is invalid
    pub fn try_new(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> FilterResult<Self> {
        let filter = Self::new(field, operator, value);
        filter.validate()?;
        Ok(filter)
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_negate(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    /// Toggle negation
    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    pub fn with_lookup(mut self, lookup: Lookup) -> Self {
        self.lookup = Some(lookup);
        self.compiled = self.compile();
        self
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_negated(&self) -> bool {
        self.negate
    }

    pub fn lookup(&self) -> Option<&Lookup> {
        self.lookup.as_ref()
    }

    /// Outcome of the validation performed at construction
    pub fn validate(&self) -> FilterResult<()> {
        self.compiled.as_ref().map(|_| ()).map_err(Clone::clone)
    }

    fn compile(&self) -> FilterResult<Compiled> {
        if self.field.trim().is_empty() {
            return Err(FilterError::EmptyField);
        }
        if let Some(lookup) = &self.lookup {
            lookup.validate()?;
        }

        let templated = matches!(&self.value, Value::String(s) if is_template(s));
        let replaced_by_lookup = self.lookup.is_some() && !self.operator.is_cardinality();

        match self.operator {
            Operator::Between if !templated && !replaced_by_lookup => match &self.value {
                Value::Array(items) if items.len() == 2 => Ok(Compiled::Nothing),
                other => Err(FilterError::BetweenArity(other.to_string())),
            },
            op if op.is_membership() && !templated && !replaced_by_lookup => {
                match &self.value {
                    Value::Array(_) => Ok(Compiled::Nothing),
                    _ => Err(FilterError::MembershipLiteral(self.operator.to_string())),
                }
            }
            Operator::Pattern if !templated => {
                let pattern = self.value.as_str().ok_or_else(|| FilterError::InvalidPattern {
                    pattern: self.value.to_string(),
                    message: "pattern must be a string".to_string(),
                })?;
                Regex::new(pattern)
                    .map(Compiled::Pattern)
                    .map_err(|e| FilterError::InvalidPattern {
                        pattern: pattern.to_string(),
                        message: e.to_string(),
                    })
            }
            Operator::Expression => {
                let source = self.value.as_str().unwrap_or_default();
                let source = template_source(source).unwrap_or(source);
                expression::parse(source)
                    .map(Compiled::Expression)
                    .map_err(|e| FilterError::InvalidExpression {
                        source_text: source.to_string(),
                        message: e.to_string(),
                    })
            }
            op if op.is_cardinality() && !templated => {
                self.threshold(&self.value).map(|_| Compiled::Nothing)
            }
            _ => Ok(Compiled::Nothing),
        }
    }

    /// Evaluate the filter against a record
    pub fn matches(&self, record: &Value) -> bool {
        let compiled = match &self.compiled {
            Ok(compiled) => compiled,
            Err(e) => {
                debug!("filter {} {} is invalid: {}", self.field, self.operator, e);
                return false;
            }
        };
        let raw = self.evaluate(compiled, record).unwrap_or_else(|e| {
            debug!(
                "filter {} {} {} failed: {:#}",
                self.field, self.operator, self.value, e
            );
            false
        });
        raw != self.negate
    }

    /// Raw outcome before negation
    fn evaluate(&self, compiled: &Compiled, record: &Value) -> anyhow::Result<bool> {

        if let Compiled::Expression(expr) = compiled {
            let result = expression::evaluate_expression(expr, record)?;
            return Ok(result.is_truthy());
        }

        let field = match self.resolve_field(record) {
            Ok(field) => field,
            Err(_) if self.operator.is_nullity() => Value::Null,
            Err(e) => return Err(e),
        };

        let mut literal = resolve_literal(&self.value, record).context("resolving literal")?;
        let mut lookup_set = None;
        if let Some(lookup) = &self.lookup {
            let data = lookup.resolve(record).context("resolving lookup")?;
            if let Value::Array(items) = &data {
                let field_has_items = matches!(&field, Value::Array(f) if !f.is_empty());
                if field_has_items && items.is_empty() {
                    trace!("lookup for {} narrowed to an empty set", self.field);
                    bail!("lookup narrowed to an empty set");
                }
            }
            if self.operator.is_cardinality() {
                lookup_set = Some(data);
            } else if !data.is_null() {
                literal = data;
            }
        }

        if let Some((kind, case_sensitive, negated)) = self.operator.string_match() {
            return string_match(&field, &literal, kind, case_sensitive).map(|m| m != negated);
        }

        match self.operator {
            Operator::Equal => equality(&field, &literal, false),
            Operator::NotEqual => equality(&field, &literal, false).map(|eq| !eq),
            Operator::EqualCs => equality(&field, &literal, true),
            Operator::NotEqualCs => equality(&field, &literal, true).map(|eq| !eq),
            Operator::LessThan => ordering(&field, &literal).map(|o| o == Ordering::Less),
            Operator::LessThanEqual => ordering(&field, &literal).map(|o| o != Ordering::Greater),
            Operator::GreaterThan => ordering(&field, &literal).map(|o| o == Ordering::Greater),
            Operator::GreaterThanEqual => ordering(&field, &literal).map(|o| o != Ordering::Less),
            Operator::Between => between(&field, &literal),
            Operator::In => Ok(membership(&field, &literal)),
            Operator::NotIn => Ok(!membership(&field, &literal)),
            Operator::IsNull => Ok(field.is_null()),
            Operator::NotNull => Ok(!field.is_null()),
            Operator::IsZero => Ok(field.is_zero()),
            Operator::NotZero => Ok(!field.is_zero()),
            Operator::Pattern => {
                let subject = field.as_str().ok_or_else(|| {
                    anyhow!("pattern needs a string field, got {}", field.type_name())
                })?;
                match compiled {
                    Compiled::Pattern(regex) => Ok(regex.is_match(subject)),
                    _ => {
                        let pattern = literal
                            .as_str()
                            .ok_or_else(|| anyhow!("pattern must be a string"))?;
                        Ok(Regex::new(pattern)?.is_match(subject))
                    }
                }
            }
            op => {
                let symbol = op
                    .count_symbol()
                    .ok_or_else(|| anyhow!("operator {} is not supported here", op))?;
                let threshold = self.threshold(&literal)?;
                cardinality(&field, lookup_set.as_ref(), symbol, threshold)
            }
        }
    }

    fn resolve_field(&self, record: &Value) -> anyhow::Result<Value> {
        if is_template(&self.field) {
            return Ok(render(&self.field, record)?);
        }
        Ok(resolve(record, &self.field)?)
    }

    fn threshold(&self, literal: &Value) -> FilterResult<i64> {
        let threshold = match literal {
            Value::Int(n) => Some(*n),
            Value::String(s) => s.trim().parse().ok(),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        };
        threshold.ok_or_else(|| FilterError::InvalidThreshold {
            operator: self.operator.to_string(),
            found: literal.to_string(),
        })
    }
}

fn equality(field: &Value, literal: &Value, case_sensitive: bool) -> anyhow::Result<bool> {
    let equal = if case_sensitive {
        equals_cs(field, literal)
    } else {
        equals(field, literal)
    };
    equal.ok_or_else(|| {
        anyhow!(
            "cannot compare {} with {}",
            field.type_name(),
            literal.type_name()
        )
    })
}

fn ordering(field: &Value, literal: &Value) -> anyhow::Result<Ordering> {
    try_compare(field, literal).ok_or_else(|| {
        anyhow!(
            "cannot order {} against {}",
            field.type_name(),
            literal.type_name()
        )
    })
}

fn between(field: &Value, literal: &Value) -> anyhow::Result<bool> {
    let [low, high] = literal
        .as_array()
        .and_then(|items| <&[Value; 2]>::try_from(items).ok())
        .ok_or_else(|| anyhow!("between needs two bounds, got {}", literal))?;
    Ok(ordering(field, low)? != Ordering::Less && ordering(field, high)? != Ordering::Greater)
}

/// Every flattened element of a sequence field, or the scalar field itself,
/// must appear in the set
fn membership(field: &Value, literal: &Value) -> bool {
    let set = match literal {
        Value::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };
    let contains = |element: &Value| set.iter().any(|candidate| same_value(element, candidate));

    match field {
        Value::Array(_) => {
            let elements = field.flatten();
            !elements.is_empty() && elements.into_iter().all(contains)
        }
        scalar => contains(scalar),
    }
}

fn string_match(
    field: &Value,
    literal: &Value,
    kind: StringMatch,
    case_sensitive: bool,
) -> anyhow::Result<bool> {
    let (Some(subject), Some(needle)) = (field.as_str(), literal.as_str()) else {
        bail!(
            "string match needs strings, got {} and {}",
            field.type_name(),
            literal.type_name()
        );
    };
    let (subject, needle) = if case_sensitive {
        (subject.to_string(), needle.to_string())
    } else {
        (subject.to_lowercase(), needle.to_lowercase())
    };
    Ok(match kind {
        StringMatch::Contains => subject.contains(&needle),
        StringMatch::StartsWith => subject.starts_with(&needle),
        StringMatch::EndsWith => subject.ends_with(&needle),
    })
}

/// Compare the number of field elements found in the lookup set against a
/// threshold
///
/// A sequence of sequences is checked per inner sequence and every inner
/// sequence must pass.
fn cardinality(
    field: &Value,
    lookup: Option<&Value>,
    symbol: &str,
    threshold: i64,
) -> anyhow::Result<bool> {
    let items = field
        .as_array()
        .ok_or_else(|| anyhow!("cardinality needs a sequence field, got {}", field.type_name()))?;
    let set = match lookup {
        None => None,
        Some(Value::Array(set)) => Some(set.as_slice()),
        Some(other) => bail!("cardinality lookup must be a sequence, got {}", other.type_name()),
    };

    if matches!(items.first(), Some(Value::Array(_))) {
        for inner in items {
            let inner = inner
                .as_array()
                .ok_or_else(|| anyhow!("mixed nested sequence in cardinality field"))?;
            if !count_matches(inner, set, symbol, threshold)? {
                return Ok(false);
            }
        }
        return Ok(true);
    }
    count_matches(items, set, symbol, threshold)
}

fn count_matches(
    items: &[Value],
    set: Option<&[Value]>,
    symbol: &str,
    threshold: i64,
) -> anyhow::Result<bool> {
    let filtered: Vec<Value> = match set {
        Some(set) => items
            .iter()
            .filter(|item| set.iter().any(|candidate| same_value(item, candidate)))
            .cloned()
            .collect(),
        None => items.to_vec(),
    };
    let bindings: Value = [("data".to_string(), Value::Array(filtered))]
        .into_iter()
        .collect();
    let source = format!("len(data) {} {}", symbol, threshold);
    Ok(expression::eval(&source, &bindings)?.is_truthy())
}
