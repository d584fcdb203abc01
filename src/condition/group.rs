use super::operator::BooleanOp;
use super::Condition;
use crate::access::Value;

/// AND/OR over an ordered list of conditions
///
/// Members are evaluated left to right and evaluation stops at the first
/// member that decides the outcome. An empty AND group matches everything, an
/// empty OR group matches nothing.
#[derive(Debug, Clone, Default)]
pub struct FilterGroup {
    pub operator: BooleanOp,
    pub conditions: Vec<Condition>,
    pub negate: bool,
}

impl FilterGroup {
    pub fn new(operator: BooleanOp, conditions: Vec<Condition>) -> Self {
        FilterGroup {
            operator,
            conditions,
            negate: false,
        }
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Self::new(BooleanOp::And, conditions)
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Self::new(BooleanOp::Or, conditions)
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

    pub fn push(&mut self, condition: impl Into<Condition>) {
        self.conditions.push(condition.into());
    }

    pub fn matches(&self, record: &Value) -> bool {
        let matched = match self.operator {
            BooleanOp::And => self.conditions.iter().all(|c| c.matches(record)),
            BooleanOp::Or => self.conditions.iter().any(|c| c.matches(record)),
        };
        matched != self.negate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Filter, Operator};
    use serde_json::json;

    fn record() -> Value {
        Value::from(json!({"price": 150, "item": "laptop"}))
    }

    fn price_over(n: i64) -> Condition {
        Filter::new("price", Operator::GreaterThan, n).into()
    }

    #[test]
    fn test_vacuous_groups() {
        assert!(FilterGroup::and(vec![]).matches(&record()));
        assert!(!FilterGroup::or(vec![]).matches(&record()));
        assert!(!FilterGroup::and(vec![]).negated().matches(&record()));
    }

    #[test]
    fn test_and_or() {
        let and = FilterGroup::and(vec![price_over(100), price_over(200)]);
        assert!(!and.matches(&record()));
        let or = FilterGroup::or(vec![price_over(100), price_over(200)]);
        assert!(or.matches(&record()));
        assert!(!or.with_negate(true).matches(&record()));
    }

    #[test]
    fn test_push() {
        let mut group = FilterGroup::and(vec![price_over(100)]);
        group.push(Filter::new("item", Operator::Equal, "LAPTOP"));
        assert_eq!(group.conditions.len(), 2);
        assert!(group.matches(&record()));
    }
}
