//! Secondary datasets substituted for a filter's literal.

use std::fmt;
use std::sync::Arc;

use super::error::{FilterError, FilterResult};
use crate::access::Value;
use crate::expression::{self, template_source};

/// Produces a lookup dataset from the record being filtered and the handler
/// argument
pub type LookupHandler = Arc<dyn Fn(&Value, &str) -> anyhow::Result<Value> + Send + Sync>;

/// A dataset attached to a filter, optionally narrowed by an expression
///
/// The narrowing expression sees two bindings: `target` is the record being
/// filtered and `lookup` is the raw dataset.
#[derive(Clone, Default)]
pub struct Lookup {
    pub data: Option<Value>,
    pub handler: Option<LookupHandler>,
    pub handler_arg: String,
    pub condition: String,
}

impl Lookup {
    /// Lookup over a fixed dataset
    pub fn from_data(data: impl Into<Value>) -> Self {
        Lookup {
            data: Some(data.into()),
            ..Default::default()
        }
    }

    /// Lookup whose dataset is produced per record by `handler`
    pub fn from_handler<F>(handler: F, handler_arg: impl Into<String>) -> Self
    where
        F: Fn(&Value, &str) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Lookup {
            handler: Some(Arc::new(handler)),
            handler_arg: handler_arg.into(),
            ..Default::default()
        }
    }

    /// Narrow the dataset with `condition`
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    fn condition_source(&self) -> Option<&str> {
        let condition = self.condition.trim();
        if condition.is_empty() {
            return None;
        }
        Some(template_source(condition).unwrap_or(condition))
    }

    pub fn validate(&self) -> FilterResult<()> {
        if self.data.is_some() == self.handler.is_some() {
            return Err(FilterError::InvalidLookup);
        }
        if let Some(source) = self.condition_source() {
            expression::parse(source).map_err(|e| FilterError::InvalidExpression {
                source_text: source.to_string(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Produce the (possibly narrowed) dataset for `record`
    pub fn resolve(&self, record: &Value) -> anyhow::Result<Value> {
        let raw = match (&self.data, &self.handler) {
            (Some(data), _) => data.clone(),
            (None, Some(handler)) => handler(record, &self.handler_arg)?,
            (None, None) => Value::Null,
        };

        let Some(source) = self.condition_source() else {
            return Ok(raw);
        };
        let bindings: Value = [
            ("target".to_string(), record.clone()),
            ("lookup".to_string(), raw),
        ]
        .into_iter()
        .collect();
        Ok(expression::eval(source, &bindings)?)
    }
}

impl fmt::Debug for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lookup")
            .field("data", &self.data)
            .field("handler", &self.handler.as_ref().map(|_| "<fn>"))
            .field("handler_arg", &self.handler_arg)
            .field("condition", &self.condition)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_lookup() {
        let lookup = Lookup::from_data(json!(["A", "B"]));
        assert!(lookup.validate().is_ok());
        assert_eq!(
            lookup.resolve(&Value::Null).unwrap(),
            Value::from(json!(["A", "B"]))
        );
    }

    #[test]
    fn test_handler_lookup_with_condition() {
        let lookup = Lookup::from_handler(
            |record: &Value, arg: &str| {
                assert_eq!(arg, "codes");
                Ok(record.get("allowed").cloned().unwrap_or_default())
            },
            "codes",
        )
        .with_condition("{{ filter(lookup, # in target.cpt) }}");

        let record = Value::from(json!({"allowed": ["A", "C"], "cpt": ["A", "B"]}));
        assert!(lookup.validate().is_ok());
        assert_eq!(lookup.resolve(&record).unwrap(), Value::from(json!(["A"])));
    }

    #[test]
    fn test_handler_error_propagates() {
        let lookup = Lookup::from_handler(|_: &Value, _: &str| anyhow::bail!("offline"), "");
        assert_eq!(lookup.resolve(&Value::Null).unwrap_err().to_string(), "offline");
    }

    #[test]
    fn test_validation() {
        assert_eq!(Lookup::default().validate(), Err(FilterError::InvalidLookup));
        let both = Lookup {
            data: Some(Value::Null),
            ..Lookup::from_handler(|_: &Value, _: &str| Ok(Value::Null), "")
        };
        assert_eq!(both.validate(), Err(FilterError::InvalidLookup));
        assert!(matches!(
            Lookup::from_data(json!([])).with_condition("lookup +").validate(),
            Err(FilterError::InvalidExpression { .. })
        ));
    }
}
