use super::group::FilterGroup;
use super::operator::BooleanOp;
use crate::access::Value;

/// Explicit binary AND/OR of two groups
///
/// Unlike a group, both sides are always evaluated.
#[derive(Debug, Clone, Default)]
pub struct Join {
    pub left: FilterGroup,
    pub right: FilterGroup,
    pub operator: BooleanOp,
    pub negate: bool,
}

impl Join {
    pub fn new(left: FilterGroup, operator: BooleanOp, right: FilterGroup) -> Self {
        Join {
            left,
            right,
            operator,
            negate: false,
        }
    }

    /// Toggle negation
    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    pub fn matches(&self, record: &Value) -> bool {
        let left = self.left.matches(record);
        let right = self.right.matches(record);
        self.operator.apply(left, right) != self.negate
    }

    /// Combine the records each side selects from `records`
    ///
    /// AND keeps records selected by both sides, OR keeps records selected by
    /// either; duplicates (by value) are dropped and input order is kept. With
    /// negation the complement of that result within `records` is returned.
    pub fn apply<'a>(&self, records: &'a [Value]) -> Vec<&'a Value> {
        let left: Vec<&Value> = records.iter().filter(|r| self.left.matches(r)).collect();
        let right: Vec<&Value> = records.iter().filter(|r| self.right.matches(r)).collect();

        let combined: Vec<&Value> = match self.operator {
            BooleanOp::And => dedup(left.iter().copied().filter(|r| right.contains(r))),
            BooleanOp::Or => dedup(left.iter().chain(right.iter()).copied()),
        };

        if !self.negate {
            return combined;
        }
        dedup(records.iter().filter(|r| !combined.contains(r)))
    }
}

fn dedup<'a>(records: impl Iterator<Item = &'a Value>) -> Vec<&'a Value> {
    let mut out: Vec<&Value> = Vec::new();
    for record in records {
        if !out.contains(&record) {
            out.push(record);
        }
    }
    out
}
