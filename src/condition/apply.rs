//! Applying conditions to collections of records.

use super::group::FilterGroup;
use super::Condition;
use crate::access::Value;

/// Records matching `condition`, in input order
pub fn filter_records<'a>(records: &'a [Value], condition: &Condition) -> Vec<&'a Value> {
    FilterIter::new(records.iter(), condition).collect()
}

/// Records matching every group
pub fn apply_groups<'a>(records: &'a [Value], groups: &[FilterGroup]) -> Vec<&'a Value> {
    records
        .iter()
        .filter(|record| groups.iter().all(|group| group.matches(record)))
        .collect()
}

/// Iterator adapter yielding the records of `inner` that match a condition
pub struct FilterIter<'c, I> {
    inner: I,
    condition: &'c Condition,
    /// Number of records inspected so far
    scanned: usize,
}

impl<'c, I> FilterIter<'c, I> {
    pub fn new(inner: I, condition: &'c Condition) -> Self {
        Self {
            inner,
            condition,
            scanned: 0,
        }
    }

    pub fn scanned(&self) -> usize {
        self.scanned
    }
}

impl<'a, 'c, I> Iterator for FilterIter<'c, I>
where
    I: Iterator<Item = &'a Value>,
{
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        for record in self.inner.by_ref() {
            self.scanned += 1;
            if self.condition.matches(record) {
                return Some(record);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Filter, Operator};
    use serde_json::json;

    fn records() -> Vec<Value> {
        vec![
            Value::from(json!({"price": 50, "item": "mouse"})),
            Value::from(json!({"price": 150, "item": "laptop"})),
            Value::from(json!({"price": 300, "item": "desk"})),
        ]
    }

    #[test]
    fn test_filter_records() {
        let records = records();
        let condition: Condition = Filter::new("price", Operator::GreaterThan, 100).into();
        let selected = filter_records(&records, &condition);
        assert_eq!(selected, vec![&records[1], &records[2]]);
    }

    #[test]
    fn test_apply_groups() {
        let records = records();
        let groups = vec![
            FilterGroup::and(vec![Filter::new("price", Operator::GreaterThan, 100).into()]),
            FilterGroup::or(vec![
                Filter::new("item", Operator::Equal, "desk").into(),
                Filter::new("item", Operator::Equal, "mouse").into(),
            ]),
        ];
        assert_eq!(apply_groups(&records, &groups), vec![&records[2]]);
        assert_eq!(apply_groups(&records, &[]).len(), 3);
    }

    #[test]
    fn test_filter_iter_is_lazy() {
        let records = records();
        let condition: Condition = Filter::new("price", Operator::LessThan, 200).into();
        let mut iter = FilterIter::new(records.iter(), &condition);

        assert_eq!(iter.next(), Some(&records[0]));
        assert_eq!(iter.scanned(), 1);
        assert_eq!(iter.next(), Some(&records[1]));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.scanned(), 3);
    }
}
