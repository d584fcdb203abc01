//! Filter operators and boolean combinators.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::error::FilterError;

/// Comparison a filter applies between a field and its literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // Equality
    Equal,
    NotEqual,
    EqualCs,
    NotEqualCs,

    // Ordering
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Between,

    // Membership
    In,
    NotIn,

    // String match, case-insensitive
    Contains,
    NotContains,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,

    // String match, case-sensitive
    ContainsCs,
    NotContainsCs,
    StartsWithCs,
    NotStartsWithCs,
    EndsWithCs,
    NotEndsWithCs,

    // Nullity and zero-ness
    IsZero,
    NotZero,
    IsNull,
    NotNull,

    Pattern,
    Expression,

    // Cardinality of the lookup-filtered field
    EqualCount,
    NotEqualCount,
    GreaterThanCount,
    GreaterThanEqualCount,
    LesserThanCount,
    LesserThanEqualCount,
}

/// Which end of a string a string-match operator looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringMatch {
    Contains,
    StartsWith,
    EndsWith,
}

impl Operator {
    pub const ALL: [Operator; 35] = [
        Operator::Equal,
        Operator::NotEqual,
        Operator::EqualCs,
        Operator::NotEqualCs,
        Operator::LessThan,
        Operator::LessThanEqual,
        Operator::GreaterThan,
        Operator::GreaterThanEqual,
        Operator::Between,
        Operator::In,
        Operator::NotIn,
        Operator::Contains,
        Operator::NotContains,
        Operator::StartsWith,
        Operator::NotStartsWith,
        Operator::EndsWith,
        Operator::NotEndsWith,
        Operator::ContainsCs,
        Operator::NotContainsCs,
        Operator::StartsWithCs,
        Operator::NotStartsWithCs,
        Operator::EndsWithCs,
        Operator::NotEndsWithCs,
        Operator::IsZero,
        Operator::NotZero,
        Operator::IsNull,
        Operator::NotNull,
        Operator::Pattern,
        Operator::Expression,
        Operator::EqualCount,
        Operator::NotEqualCount,
        Operator::GreaterThanCount,
        Operator::GreaterThanEqualCount,
        Operator::LesserThanCount,
        Operator::LesserThanEqualCount,
    ];

    /// Wire code used by query strings and rule definitions
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "eq",
            Operator::NotEqual => "ne",
            Operator::EqualCs => "eq_cs",
            Operator::NotEqualCs => "ne_cs",
            Operator::LessThan => "lt",
            Operator::LessThanEqual => "le",
            Operator::GreaterThan => "gt",
            Operator::GreaterThanEqual => "ge",
            Operator::Between => "between",
            Operator::In => "in",
            Operator::NotIn => "nin",
            Operator::Contains => "contains",
            Operator::NotContains => "ncontains",
            Operator::StartsWith => "startswith",
            Operator::NotStartsWith => "nstartswith",
            Operator::EndsWith => "endswith",
            Operator::NotEndsWith => "nendswith",
            Operator::ContainsCs => "contains_cs",
            Operator::NotContainsCs => "ncontains_cs",
            Operator::StartsWithCs => "startswith_cs",
            Operator::NotStartsWithCs => "nstartswith_cs",
            Operator::EndsWithCs => "endswith_cs",
            Operator::NotEndsWithCs => "nendswith_cs",
            Operator::IsZero => "izero",
            Operator::NotZero => "nzero",
            Operator::IsNull => "null",
            Operator::NotNull => "nnull",
            Operator::Pattern => "pattern",
            Operator::Expression => "expr",
            Operator::EqualCount => "eqc",
            Operator::NotEqualCount => "nec",
            Operator::GreaterThanCount => "gtc",
            Operator::GreaterThanEqualCount => "gec",
            Operator::LesserThanCount => "ltc",
            Operator::LesserThanEqualCount => "lec",
        }
    }

    pub fn is_cardinality(&self) -> bool {
        self.count_symbol().is_some()
    }

    pub fn is_nullity(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::NotNull)
    }

    pub fn is_membership(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// Whether the operator compares against a literal at all
    pub fn requires_value(&self) -> bool {
        !matches!(
            self,
            Operator::IsZero | Operator::NotZero | Operator::IsNull | Operator::NotNull
        )
    }

    /// Comparison symbol applied to the count for cardinality operators
    pub fn count_symbol(&self) -> Option<&'static str> {
        match self {
            Operator::EqualCount => Some("=="),
            Operator::NotEqualCount => Some("!="),
            Operator::GreaterThanCount => Some(">"),
            Operator::GreaterThanEqualCount => Some(">="),
            Operator::LesserThanCount => Some("<"),
            Operator::LesserThanEqualCount => Some("<="),
            _ => None,
        }
    }

    /// Decompose a string-match operator into `(kind, case_sensitive, negated)`
    pub fn string_match(&self) -> Option<(StringMatch, bool, bool)> {
        let parts = match self {
            Operator::Contains => (StringMatch::Contains, false, false),
            Operator::NotContains => (StringMatch::Contains, false, true),
            Operator::StartsWith => (StringMatch::StartsWith, false, false),
            Operator::NotStartsWith => (StringMatch::StartsWith, false, true),
            Operator::EndsWith => (StringMatch::EndsWith, false, false),
            Operator::NotEndsWith => (StringMatch::EndsWith, false, true),
            Operator::ContainsCs => (StringMatch::Contains, true, false),
            Operator::NotContainsCs => (StringMatch::Contains, true, true),
            Operator::StartsWithCs => (StringMatch::StartsWith, true, false),
            Operator::NotStartsWithCs => (StringMatch::StartsWith, true, true),
            Operator::EndsWithCs => (StringMatch::EndsWith, true, false),
            Operator::NotEndsWithCs => (StringMatch::EndsWith, true, true),
            _ => return None,
        };
        Some(parts)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        let alias = match code.as_str() {
            "isnull" | "is_null" => Some(Operator::IsNull),
            "notnull" | "not_null" | "isnotnull" => Some(Operator::NotNull),
            "iszero" | "is_zero" => Some(Operator::IsZero),
            "notzero" | "not_zero" => Some(Operator::NotZero),
            _ => None,
        };
        alias
            .or_else(|| Operator::ALL.into_iter().find(|op| op.as_str() == code))
            .ok_or_else(|| FilterError::UnknownOperator(s.to_string()))
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        code.parse().map_err(serde::de::Error::custom)
    }
}

/// Boolean combinator joining conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BooleanOp {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

impl BooleanOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BooleanOp::And => "AND",
            BooleanOp::Or => "OR",
        }
    }

    /// Combine two already evaluated operands
    pub fn apply(&self, left: bool, right: bool) -> bool {
        match self {
            BooleanOp::And => left && right,
            BooleanOp::Or => left || right,
        }
    }
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BooleanOp {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" | "&&" => Ok(BooleanOp::And),
            "OR" | "||" => Ok(BooleanOp::Or),
            _ => Err(FilterError::UnknownBooleanOp(s.to_string())),
        }
    }
}
