//! Sequential rule chains.
//!
//! A [`Rule`] is a linked chain `head OP next`, where `next` is itself a rule.
//! The chain is folded strictly from the left head towards the tail, so
//! `a AND b OR c` means `a AND (b OR c)`. Precedence between mixed AND/OR
//! must be spelled out with nested groups or rules.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use super::filter::Filter;
use super::operator::{BooleanOp, Operator};
use super::Condition;
use crate::access::Value;
use crate::sql::{self, SqlError};

/// Message and action reported when a rule does not match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error_msg: String,
    #[serde(default)]
    pub error_action: String,
}

/// A record failed a rule
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{error_msg} ({error_action})")]
pub struct RuleViolation {
    pub error_msg: String,
    pub error_action: String,
}

#[derive(Debug, Clone)]
pub struct Rule {
    head: Box<Condition>,
    operator: BooleanOp,
    next: Option<Box<Rule>>,
    negate: bool,
    source: Option<String>,
    error_response: ErrorResponse,
}

impl Rule {
    /// Single-condition rule
    pub fn new(head: impl Into<Condition>) -> Self {
        Rule {
            head: Box::new(head.into()),
            operator: BooleanOp::And,
            next: None,
            negate: false,
            source: None,
            error_response: ErrorResponse::default(),
        }
    }

    /// Build a chain from `(condition, combinator to the following link)`
    /// pairs. The combinator of the last link is kept but has no partner.
    pub fn from_links(links: Vec<(Condition, BooleanOp)>) -> Option<Self> {
        links.into_iter().rev().fold(None, |next, (condition, operator)| {
            Some(Rule {
                operator,
                next: next.map(Box::new),
                ..Rule::new(condition)
            })
        })
    }

    pub fn head(&self) -> &Condition {
        &self.head
    }

    pub fn operator(&self) -> BooleanOp {
        self.operator
    }

    pub fn next(&self) -> Option<&Rule> {
        self.next.as_deref()
    }

    pub fn is_negated(&self) -> bool {
        self.negate
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

    /// Clause text the rule was parsed from
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_error_response(
        mut self,
        error_msg: impl Into<String>,
        error_action: impl Into<String>,
    ) -> Self {
        self.error_response = ErrorResponse {
            error_msg: error_msg.into(),
            error_action: error_action.into(),
        };
        self
    }

    pub fn error_response(&self) -> &ErrorResponse {
        &self.error_response
    }

    /// Links of the chain, head first
    pub fn links(&self) -> impl Iterator<Item = &Rule> {
        std::iter::successors(Some(self), |rule| rule.next())
    }

    pub fn matches(&self, record: &Value) -> bool {
        let head = self.head.matches(record);
        let matched = match (&self.next, self.operator) {
            (_, BooleanOp::And) if !head => false,
            (None, _) => head,
            (Some(next), operator) => operator.apply(head, next.matches(record)),
        };
        matched != self.negate
    }

    /// `Ok` when the record matches, the rule's error response otherwise
    pub fn validate(&self, record: &Value) -> Result<(), RuleViolation> {
        if self.matches(record) {
            return Ok(());
        }
        log::debug!("rule {} rejected record", self.source().unwrap_or("<built>"));
        Err(RuleViolation {
            error_msg: self.error_response.error_msg.clone(),
            error_action: self.error_response.error_action.clone(),
        })
    }

    /// Run `callback` on a record that satisfies the rule
    pub fn apply<T, F>(&self, record: &Value, callback: F) -> Result<T, RuleViolation>
    where
        F: FnOnce(&Value) -> T,
    {
        self.validate(record)?;
        Ok(callback(record))
    }

    /// First equality filter in chain order, looking inside nested groups and
    /// rules
    pub fn first_term_filter(&self) -> Option<&Filter> {
        self.links().find_map(|link| first_equal(&link.head))
    }
}

fn first_equal(condition: &Condition) -> Option<&Filter> {
    match condition {
        Condition::Filter(filter) if filter.operator() == Operator::Equal => Some(filter),
        Condition::Filter(_) => None,
        Condition::Group(group) => group.conditions.iter().find_map(first_equal),
        Condition::Rule(rule) => rule.first_term_filter(),
        Condition::Join(join) => join
            .left
            .conditions
            .iter()
            .chain(join.right.conditions.iter())
            .find_map(first_equal),
    }
}

impl FromStr for Rule {
    type Err = SqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        sql::parse(s)
    }
}

/// Incremental construction of a rule chain
#[derive(Debug, Default)]
pub struct RuleBuilder {
    links: Vec<(Condition, BooleanOp)>,
    negate: bool,
    error_response: ErrorResponse,
}

impl RuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append conditions to the chain
    ///
    /// A single condition is appended as is; several are wrapped in a group
    /// combined with `operator` and negated by `negate`. `operator` is also
    /// the combinator between this link and the next one. On the first call
    /// with a single condition `negate` applies to the whole rule; on later
    /// calls it applies to the appended condition.
    pub fn add_condition(
        &mut self,
        operator: BooleanOp,
        negate: bool,
        mut conditions: Vec<Condition>,
    ) -> &mut Self {
        let first = self.links.is_empty();
        let condition = match conditions.len() {
            0 => return self,
            1 => {
                let condition = conditions.remove(0);
                if first {
                    self.negate = negate;
                    condition
                } else if negate {
                    condition.negated()
                } else {
                    condition
                }
            }
            _ => super::FilterGroup::new(operator, conditions)
                .with_negate(negate)
                .into(),
        };
        self.links.push((condition, operator));
        self
    }

    pub fn error_response(
        &mut self,
        error_msg: impl Into<String>,
        error_action: impl Into<String>,
    ) -> &mut Self {
        self.error_response = ErrorResponse {
            error_msg: error_msg.into(),
            error_action: error_action.into(),
        };
        self
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Finish the chain, `None` if no condition was added
    pub fn build(&self) -> Option<Rule> {
        let mut rule = Rule::from_links(self.links.clone())?;
        rule.negate = self.negate;
        rule.error_response = self.error_response.clone();
        Some(rule)
    }
}
