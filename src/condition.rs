//! Predicate trees over records.
//!
//! A tree is made of four kinds of node:
//! - [`Filter`]: a single `field OP value` comparison
//! - [`FilterGroup`]: AND/OR over an ordered list of conditions
//! - [`Rule`]: a sequential chain folded from its head towards its tail
//! - [`Join`]: an explicit binary combination of two groups
//!
//! Every node carries its own negation flag. Evaluation never fails: a
//! condition that cannot be evaluated against a record does not match it.

pub mod apply;
pub mod error;
pub mod filter;
pub mod group;
pub mod join;
pub mod lookup;
pub mod operator;
pub mod rule;

pub use apply::{apply_groups, filter_records, FilterIter};
pub use error::{FilterError, FilterResult};
pub use filter::Filter;
pub use group::FilterGroup;
pub use join::Join;
pub use lookup::{Lookup, LookupHandler};
pub use operator::{BooleanOp, Operator, StringMatch};
pub use rule::{ErrorResponse, Rule, RuleBuilder, RuleViolation};

use crate::access::Value;

/// Any node of a predicate tree
#[derive(Debug, Clone)]
pub enum Condition {
    Filter(Filter),
    Group(FilterGroup),
    Rule(Rule),
    Join(Join),
}

impl Condition {
    pub fn matches(&self, record: &Value) -> bool {
        match self {
            Condition::Filter(filter) => filter.matches(record),
            Condition::Group(group) => group.matches(record),
            Condition::Rule(rule) => rule.matches(record),
            Condition::Join(join) => join.matches(record),
        }
    }

    /// The same node with its negation flag toggled
    pub fn negated(self) -> Self {
        match self {
            Condition::Filter(filter) => Condition::Filter(filter.negated()),
            Condition::Group(group) => Condition::Group(group.negated()),
            Condition::Rule(rule) => Condition::Rule(rule.negated()),
            Condition::Join(join) => Condition::Join(join.negated()),
        }
    }

    pub fn is_negated(&self) -> bool {
        match self {
            Condition::Filter(filter) => filter.is_negated(),
            Condition::Group(group) => group.negate,
            Condition::Rule(rule) => rule.is_negated(),
            Condition::Join(join) => join.negate,
        }
    }
}

impl From<Filter> for Condition {
    fn from(filter: Filter) -> Self {
        Condition::Filter(filter)
    }
}

impl From<FilterGroup> for Condition {
    fn from(group: FilterGroup) -> Self {
        Condition::Group(group)
    }
}

impl From<Rule> for Condition {
    fn from(rule: Rule) -> Self {
        Condition::Rule(rule)
    }
}

impl From<Join> for Condition {
    fn from(join: Join) -> Self {
        Condition::Join(join)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_node_kind_negates() {
        let record = Value::from(json!({"price": 150}));
        let filter = Filter::new("price", Operator::GreaterThan, 100);
        let nodes: Vec<Condition> = vec![
            filter.clone().into(),
            FilterGroup::and(vec![filter.clone().into()]).into(),
            Rule::new(filter.clone()).into(),
            Join::new(
                FilterGroup::and(vec![filter.clone().into()]),
                BooleanOp::And,
                FilterGroup::and(vec![]),
            )
            .into(),
        ];

        for node in nodes {
            assert!(node.matches(&record));
            assert!(!node.is_negated());
            let negated = node.negated();
            assert!(negated.is_negated());
            assert!(!negated.matches(&record));
            assert!(negated.negated().matches(&record));
        }
    }
}
