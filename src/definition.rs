//! JSON rule definitions.
//!
//! A [`RuleRequest`] describes a rule as a list of filter groups plus a list
//! of left/right group pairs. [`RuleRequest::build`] turns it into a [`Rule`]
//! chain, appending every group and every pair in order.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::access::Value;
use crate::condition::{
    BooleanOp, Condition, Filter, FilterError, FilterGroup, Lookup, Operator, Rule, RuleBuilder,
};

#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("failed to read rule file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rule definition: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid filter on '{field}': {source}")]
    InvalidFilter {
        field: String,
        #[source]
        source: FilterError,
    },

    #[error("filter key '{0}' has no field and no resolver")]
    UnresolvedKey(String),

    #[error("rule definition has no conditions")]
    Empty,
}

pub type DefinitionResult<T> = Result<T, DefinitionError>;

/// Looks up a stored filter by its key
pub type FilterResolver<'a> = &'a dyn Fn(&str) -> Option<Filter>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub field: String,
    #[serde(default = "default_operator")]
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup: Option<LookupDefinition>,
}

fn default_operator() -> Operator {
    Operator::Equal
}

impl FilterDefinition {
    pub fn to_filter(&self) -> DefinitionResult<Filter> {
        let mut filter = Filter::new(self.field.as_str(), self.operator, self.value.clone())
            .with_negate(self.reverse);
        if let Some(key) = &self.key {
            filter = filter.with_key(key.as_str());
        }
        if let Some(lookup) = &self.lookup {
            filter = filter.with_lookup(Lookup {
                data: lookup.data.clone(),
                condition: lookup.condition.clone(),
                ..Default::default()
            });
        }

        filter
            .validate()
            .map_err(|source| DefinitionError::InvalidFilter {
                field: self.field.clone(),
                source,
            })?;
        Ok(filter)
    }
}

impl From<&Filter> for FilterDefinition {
    /// Handler-backed lookups have no JSON form and are left out
    fn from(filter: &Filter) -> Self {
        let lookup = filter
            .lookup()
            .filter(|lookup| lookup.data.is_some())
            .map(|lookup| LookupDefinition {
                data: lookup.data.clone(),
                condition: lookup.condition.clone(),
            });
        FilterDefinition {
            key: filter.key().map(str::to_string),
            field: filter.field().to_string(),
            operator: filter.operator(),
            value: filter.value().clone(),
            reverse: filter.is_negated(),
            lookup,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupRequest {
    #[serde(default)]
    pub operator: BooleanOp,
    #[serde(default)]
    pub filters: Vec<FilterDefinition>,
    #[serde(default)]
    pub reverse: bool,
}

impl GroupRequest {
    /// Filters of the group, stored ones fetched through `resolver`
    ///
    /// A keyed filter the resolver does not know falls back to its inline
    /// definition, or is dropped if it has none.
    pub fn resolve(&self, resolver: Option<FilterResolver>) -> DefinitionResult<Vec<Condition>> {
        let mut conditions = Vec::with_capacity(self.filters.len());

        for definition in &self.filters {
            let stored = match (&definition.key, resolver) {
                (Some(key), Some(resolve)) => resolve(key.as_str()),
                _ => None,
            };
            match (stored, &definition.key) {
                (Some(filter), _) => conditions.push(filter.into()),
                (None, Some(key)) if definition.field.is_empty() => {
                    if resolver.is_none() {
                        return Err(DefinitionError::UnresolvedKey(key.clone()));
                    }
                    log::debug!("dropping filter with unknown key {}", key);
                }
                (None, _) => conditions.push(definition.to_filter()?.into()),
            }
        }

        Ok(conditions)
    }

    /// The group as a condition, `None` if it resolves to no filters
    pub fn to_group(
        &self,
        resolver: Option<FilterResolver>,
    ) -> DefinitionResult<Option<FilterGroup>> {
        let conditions = self.resolve(resolver)?;
        if conditions.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            FilterGroup::new(self.operator, conditions).with_negate(self.reverse),
        ))
    }
}

/// Two groups combined with `operator`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupPair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<GroupRequest>,
    #[serde(default)]
    pub operator: BooleanOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<GroupRequest>,
    #[serde(default)]
    pub reverse: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleRequest {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub error_msg: String,
    #[serde(default)]
    pub error_action: String,
    #[serde(default)]
    pub conditions: Vec<GroupRequest>,
    #[serde(default)]
    pub groups: Vec<GroupPair>,
}

impl RuleRequest {
    /// Build the rule chain: each condition group is appended with its own
    /// operator and negation, then each pair as a group of its two sides
    pub fn build(&self, resolver: Option<FilterResolver>) -> DefinitionResult<Rule> {
        let mut builder = RuleBuilder::new();

        for group in &self.conditions {
            let conditions = group.resolve(resolver)?;
            builder.add_condition(group.operator, group.reverse, conditions);
        }

        for pair in &self.groups {
            let mut sides: Vec<Condition> = Vec::with_capacity(2);
            for side in [&pair.left, &pair.right].into_iter().flatten() {
                if let Some(group) = side.to_group(resolver)? {
                    sides.push(group.into());
                }
            }
            builder.add_condition(pair.operator, pair.reverse, sides);
        }

        builder.error_response(self.error_msg.as_str(), self.error_action.as_str());
        let rule = builder.build().ok_or(DefinitionError::Empty)?;
        log::debug!(
            "built rule {:?} with {} link(s)",
            self.id,
            rule.links().count()
        );
        Ok(rule)
    }
}

/// A rule request registered under a key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRule {
    pub rule: RuleRequest,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub parent_key: String,
}

impl ApplicationRule {
    pub fn build(&self, resolver: Option<FilterResolver>) -> DefinitionResult<Rule> {
        self.rule.build(resolver)
    }
}

impl From<RuleRequest> for ApplicationRule {
    fn from(rule: RuleRequest) -> Self {
        ApplicationRule {
            rule,
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RuleFile {
    Application(ApplicationRule),
    Request(RuleRequest),
}

/// Parse an [`ApplicationRule`] or a bare [`RuleRequest`] from JSON text
pub fn parse_rule(json: &str) -> DefinitionResult<ApplicationRule> {
    let file: RuleFile = serde_json::from_str(json)?;
    Ok(match file {
        RuleFile::Application(rule) => rule,
        RuleFile::Request(rule) => rule.into(),
    })
}

/// Read a rule definition file
pub fn load_rule(path: impl AsRef<Path>) -> DefinitionResult<ApplicationRule> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|source| DefinitionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_rule(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    const REQUEST: &str = r#"{
        "id": "discount-check",
        "error_msg": "Order not eligible",
        "error_action": "restrict",
        "conditions": [
            {
                "operator": "AND",
                "filters": [
                    {"field": "price", "operator": "gt", "value": 100},
                    {"field": "status", "operator": "in", "value": ["open", "pending"]}
                ]
            }
        ],
        "groups": [
            {
                "left": {
                    "operator": "OR",
                    "filters": [{"field": "item", "operator": "eq", "value": "laptop"}]
                },
                "operator": "OR",
                "right": {"filters": [{"field": "discount", "operator": "gt", "value": 50}]}
            }
        ]
    }"#;

    fn order(price: i64, item: &str, discount: i64) -> Value {
        Value::from(json!({"price": price, "status": "open", "item": item, "discount": discount}))
    }

    #[test]
    fn test_build_request() {
        let request: RuleRequest = serde_json::from_str(REQUEST).unwrap();
        assert_eq!(request.conditions[0].filters.len(), 2);
        assert_eq!(request.groups[0].right.as_ref().unwrap().operator, BooleanOp::And);

        let rule = request.build(None).unwrap();
        assert_eq!(rule.links().count(), 2);
        assert!(rule.matches(&order(150, "laptop", 0)));
        assert!(rule.matches(&order(150, "desk", 60)));
        assert!(!rule.matches(&order(150, "desk", 0)));
        assert!(!rule.matches(&order(50, "laptop", 0)));

        let violation = rule.validate(&order(50, "laptop", 0)).unwrap_err();
        assert_eq!(violation.error_msg, "Order not eligible");
        assert_eq!(violation.error_action, "restrict");
    }

    #[test]
    fn test_reverse_single_filter_group() {
        let request: RuleRequest = serde_json::from_value(json!({
            "conditions": [
                {"reverse": true, "filters": [{"field": "item", "value": "desk"}]}
            ]
        }))
        .unwrap();
        let rule = request.build(None).unwrap();
        assert!(rule.is_negated());
        assert!(rule.matches(&order(1, "laptop", 0)));
        assert!(!rule.matches(&order(1, "desk", 0)));
    }

    #[test]
    fn test_resolver() {
        let request: RuleRequest = serde_json::from_value(json!({
            "conditions": [
                {"filters": [
                    {"key": "expensive"},
                    {"key": "unknown"},
                    {"field": "item", "value": "laptop"}
                ]}
            ]
        }))
        .unwrap();

        let resolver = |key: &str| match key {
            "expensive" => Some(Filter::new("price", Operator::GreaterThan, 100)),
            _ => None,
        };
        let rule = request.build(Some(&resolver)).unwrap();
        assert!(rule.matches(&order(150, "laptop", 0)));
        assert!(!rule.matches(&order(50, "laptop", 0)));

        assert!(matches!(
            request.build(None),
            Err(DefinitionError::UnresolvedKey(key)) if key == "expensive"
        ));
    }

    #[test]
    fn test_lookup_definition() {
        let definition: FilterDefinition = serde_json::from_value(json!({
            "field": "codes",
            "operator": "gec",
            "value": 1,
            "lookup": {"data": ["A"]}
        }))
        .unwrap();
        let filter = definition.to_filter().unwrap();
        assert!(filter.matches(&Value::from(json!({"codes": ["A", "A", "B"]}))));
        assert!(!filter.matches(&Value::from(json!({"codes": ["B", "C"]}))));

        let back = FilterDefinition::from(&filter);
        assert_eq!(back, definition);
    }

    #[test]
    fn test_invalid_definitions() {
        let definition: FilterDefinition = serde_json::from_value(json!({
            "field": "age", "operator": "between", "value": [1]
        }))
        .unwrap();
        assert!(matches!(
            definition.to_filter(),
            Err(DefinitionError::InvalidFilter { .. })
        ));

        assert!(matches!(
            RuleRequest::default().build(None),
            Err(DefinitionError::Empty)
        ));
        assert!(matches!(parse_rule("not json"), Err(DefinitionError::Json(_))));
    }

    #[test]
    fn test_load_rule() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            json!({
                "key": "orders",
                "level": "app",
                "rule": serde_json::from_str::<serde_json::Value>(REQUEST).unwrap()
            })
        )
        .unwrap();

        let application = load_rule(file.path()).unwrap();
        assert_eq!(application.key, "orders");
        assert_eq!(application.rule.id, "discount-check");
        assert!(application.build(None).unwrap().matches(&order(150, "laptop", 0)));

        let mut bare = tempfile::NamedTempFile::new().unwrap();
        write!(bare, "{}", REQUEST).unwrap();
        let application = load_rule(bare.path()).unwrap();
        assert!(application.key.is_empty());
        assert_eq!(application.rule.error_action, "restrict");

        assert!(matches!(
            load_rule("/nonexistent/rule.json"),
            Err(DefinitionError::Io { .. })
        ));
    }
}
