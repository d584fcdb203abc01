//! Expression evaluation implementation.

use std::cmp::Ordering;

use super::function::{call_function, PREDICATE_FUNCTIONS};
use crate::access::{try_compare, Value};
use crate::expression::{
    BinaryOperator, Expression, ExpressionError, ExpressionResult, UnaryOperator,
};

/// Evaluator for expressions
pub struct ExpressionEvaluator<'a> {
    /// Names visible to identifiers
    bindings: &'a Value,
    /// Element bound to `#` inside predicate functions
    current: Option<&'a Value>,
}

impl<'a> ExpressionEvaluator<'a> {
    /// Create a new evaluator over `bindings`
    pub fn new(bindings: &'a Value) -> Self {
        Self {
            bindings,
            current: None,
        }
    }

    fn with_current<'b>(&self, current: &'b Value) -> ExpressionEvaluator<'b>
    where
        'a: 'b,
    {
        ExpressionEvaluator {
            bindings: self.bindings,
            current: Some(current),
        }
    }

    /// Evaluate an expression and return the result
    pub fn evaluate(&self, expr: &Expression) -> ExpressionResult<Value> {
        match expr {
            Expression::Literal(value) => Ok(value.clone()),

            Expression::Identifier(name) => self.evaluate_identifier(name),

            Expression::Current => self
                .current
                .cloned()
                .ok_or_else(|| ExpressionError::evaluation("'#' used outside of a predicate")),

            Expression::Array(items) => items
                .iter()
                .map(|item| self.evaluate(item))
                .collect::<ExpressionResult<Vec<_>>>()
                .map(Value::Array),

            Expression::Member { object, name } => {
                let object = self.evaluate(object)?;
                member(&object, name)
            }

            Expression::Index { object, index } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                self.evaluate_index(&object, &index)
            }

            Expression::Call { name, args } => {
                if PREDICATE_FUNCTIONS.contains(&name.as_str()) {
                    return self.evaluate_predicate_call(name, args);
                }
                let values = args
                    .iter()
                    .map(|arg| self.evaluate(arg))
                    .collect::<ExpressionResult<Vec<_>>>()?;
                call_function(name, &values)
            }

            Expression::BinaryOp { op, left, right } => match op {
                op if op.is_logical() => {
                    let left_truthy = self.evaluate(left)?.is_truthy();
                    if let Some(decided) = op.short_circuit(left_truthy) {
                        return Ok(Value::Boolean(decided));
                    }
                    Ok(Value::Boolean(self.evaluate(right)?.is_truthy()))
                }
                _ => {
                    let left_val = self.evaluate(left)?;
                    let right_val = self.evaluate(right)?;
                    self.evaluate_binary_op(*op, left_val, right_val)
                }
            },

            Expression::UnaryOp { op, operand } => {
                let operand_val = self.evaluate(operand)?;
                self.evaluate_unary_op(*op, operand_val)
            }
        }
    }

    fn evaluate_identifier(&self, name: &str) -> ExpressionResult<Value> {
        match self.bindings.get(name) {
            Some(value) => Ok(value.clone()),
            None => Err(ExpressionError::UnknownIdentifier {
                name: name.to_string(),
            }),
        }
    }

    fn evaluate_index(&self, object: &Value, index: &Value) -> ExpressionResult<Value> {
        match (object, index) {
            (Value::Array(items), Value::Int(i)) => {
                let len = items.len();
                let resolved = if *i < 0 { len as i64 + i } else { *i };
                usize::try_from(resolved)
                    .ok()
                    .and_then(|i| items.get(i))
                    .cloned()
                    .ok_or(ExpressionError::IndexOutOfRange { index: *i, len })
            }
            (Value::Object(_), Value::String(key)) => member(object, key),
            (Value::Null, _) => Ok(Value::Null),
            _ => Err(ExpressionError::InvalidOperandTypes {
                operator: "[]".to_string(),
                left_type: object.data_type(),
                right_type: index.data_type(),
            }),
        }
    }

    /// Evaluate `name(seq, body)` with `body` run once per element of `seq`
    fn evaluate_predicate_call(&self, name: &str, args: &[Expression]) -> ExpressionResult<Value> {
        let [sequence, body] = args else {
            return Err(ExpressionError::FunctionArgumentCount {
                function: name.to_string(),
                expected: 2,
                actual: args.len(),
            });
        };

        let sequence = self.evaluate(sequence)?;
        let items: &[Value] = match &sequence {
            Value::Array(items) => items,
            Value::Null => &[],
            other => {
                return Err(ExpressionError::InvalidOperandTypes {
                    operator: name.to_string(),
                    left_type: other.data_type(),
                    right_type: None,
                })
            }
        };

        let mut selected = Vec::new();
        let mut matched = 0usize;
        for item in items {
            let result = self.with_current(item).evaluate(body)?;
            if name == "map" {
                selected.push(result);
                continue;
            }
            if result.is_truthy() {
                matched += 1;
                if name == "filter" {
                    selected.push(item.clone());
                }
                if name == "any" {
                    return Ok(Value::Boolean(true));
                }
                if name == "none" {
                    return Ok(Value::Boolean(false));
                }
            } else if name == "all" {
                return Ok(Value::Boolean(false));
            }
        }

        Ok(match name {
            "filter" | "map" => Value::Array(selected),
            "count" => Value::from(matched),
            "any" => Value::Boolean(false),
            _ => Value::Boolean(true),
        })
    }

    /// Evaluate a binary operation
    fn evaluate_binary_op(
        &self,
        op: BinaryOperator,
        left: Value,
        right: Value,
    ) -> ExpressionResult<Value> {
        let invalid = || ExpressionError::InvalidOperandTypes {
            operator: op.as_str().to_string(),
            left_type: left.data_type(),
            right_type: right.data_type(),
        };

        match op {
            BinaryOperator::Eq => Ok(Value::Boolean(values_equal(&left, &right))),
            BinaryOperator::Ne => Ok(Value::Boolean(!values_equal(&left, &right))),

            BinaryOperator::Lt | BinaryOperator::Le | BinaryOperator::Gt | BinaryOperator::Ge => {
                let ordering = try_compare(&left, &right).ok_or_else(invalid)?;
                op.accepts(ordering).map(Value::Boolean).ok_or_else(invalid)
            }

            BinaryOperator::In | BinaryOperator::NotIn => {
                let found = match &right {
                    Value::Array(items) => items.iter().any(|item| values_equal(&left, item)),
                    Value::Object(map) => map.contains_key(left.to_string().as_str()),
                    Value::String(s) => left.as_str().is_some_and(|needle| s.contains(needle)),
                    Value::Null => false,
                    _ => return Err(invalid()),
                };
                Ok(Value::Boolean(found == (op == BinaryOperator::In)))
            }

            BinaryOperator::Add => match (&left, &right) {
                (Value::Int(a), Value::Int(b)) => {
                    a.checked_add(*b).map(Value::Int).ok_or_else(overflow)
                }
                (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
                (Value::Array(a), Value::Array(b)) => {
                    Ok(Value::Array(a.iter().chain(b.iter()).cloned().collect()))
                }
                _ => float_op(&left, &right, |a, b| a + b).ok_or_else(invalid),
            },

            BinaryOperator::Sub => match (&left, &right) {
                (Value::Int(a), Value::Int(b)) => {
                    a.checked_sub(*b).map(Value::Int).ok_or_else(overflow)
                }
                _ => float_op(&left, &right, |a, b| a - b).ok_or_else(invalid),
            },

            BinaryOperator::Mul => match (&left, &right) {
                (Value::Int(a), Value::Int(b)) => {
                    a.checked_mul(*b).map(Value::Int).ok_or_else(overflow)
                }
                _ => float_op(&left, &right, |a, b| a * b).ok_or_else(invalid),
            },

            BinaryOperator::Div => {
                let (a, b) = match (left.as_f64(), right.as_f64()) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Err(invalid()),
                };
                if b == 0.0 {
                    return Err(ExpressionError::DivisionByZero);
                }
                match (&left, &right) {
                    (Value::Int(x), Value::Int(y)) if x.checked_rem(*y) == Some(0) => {
                        Ok(Value::Int(x / y))
                    }
                    _ => Ok(Value::Float(a / b)),
                }
            }

            BinaryOperator::Mod => match (&left, &right) {
                (Value::Int(_), Value::Int(0)) => Err(ExpressionError::DivisionByZero),
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_rem(*b))),
                _ => Err(invalid()),
            },

            // Short-circuited in `evaluate`
            BinaryOperator::And | BinaryOperator::Or => {
                let decided = op.short_circuit(left.is_truthy());
                Ok(Value::Boolean(decided.unwrap_or_else(|| right.is_truthy())))
            }
        }
    }

    /// Evaluate a unary operation
    fn evaluate_unary_op(&self, op: UnaryOperator, operand: Value) -> ExpressionResult<Value> {
        match op {
            UnaryOperator::Not => match operand {
                Value::Null => Ok(Value::Boolean(true)),
                Value::Boolean(b) => Ok(Value::Boolean(!b)),
                _ => Err(ExpressionError::InvalidOperandTypes {
                    operator: op.as_str().to_string(),
                    left_type: operand.data_type(),
                    right_type: None,
                }),
            },

            UnaryOperator::Minus => match operand {
                Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(overflow),
                Value::Float(f) => Ok(Value::Float(-f)),
                _ => Err(ExpressionError::InvalidOperandTypes {
                    operator: op.as_str().to_string(),
                    left_type: operand.data_type(),
                    right_type: None,
                }),
            },
        }
    }
}

/// Equality used by `==`, `in` and the collection functions
///
/// Containers compare structurally; scalars go through the comparison engine so
/// `1 == 1.0` and date strings compare by instant.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            left == right
        }
        _ => try_compare(left, right) == Some(Ordering::Equal),
    }
}

fn member(object: &Value, name: &str) -> ExpressionResult<Value> {
    match object {
        Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
        Value::Null => Ok(Value::Null),
        other => Err(ExpressionError::InvalidOperandTypes {
            operator: ".".to_string(),
            left_type: other.data_type(),
            right_type: None,
        }),
    }
}

fn float_op(left: &Value, right: &Value, f: impl Fn(f64, f64) -> f64) -> Option<Value> {
    Some(Value::Float(f(left.as_f64()?, right.as_f64()?)))
}

fn overflow() -> ExpressionError {
    ExpressionError::evaluation("integer overflow")
}

/// Helper function to evaluate parsed expression against bindings
pub fn evaluate_expression(expr: &Expression, bindings: &Value) -> ExpressionResult<Value> {
    ExpressionEvaluator::new(bindings).evaluate(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parse;
    use serde_json::json;

    fn eval(source: &str, bindings: serde_json::Value) -> ExpressionResult<Value> {
        let bindings = Value::from(bindings);
        evaluate_expression(&parse(source)?, &bindings)
    }

    #[test]
    fn test_literal_evaluation() {
        assert_eq!(eval("42", json!({})).unwrap(), Value::Int(42));
        assert_eq!(eval("true", json!({})).unwrap(), Value::Boolean(true));
        assert_eq!(eval("'hello'", json!({})).unwrap(), Value::from("hello"));
        assert_eq!(eval("nil", json!({})).unwrap(), Value::Null);
        assert_eq!(eval("[1, 'a']", json!({})).unwrap(), Value::from(json!([1, "a"])));
    }

    #[test]
    fn test_identifier_evaluation() {
        let record = json!({"price": 150, "item": {"name": "laptop"}});
        assert_eq!(eval("price", record.clone()).unwrap(), Value::Int(150));
        assert_eq!(eval("item.name", record.clone()).unwrap(), Value::from("laptop"));
        assert_eq!(eval("item['name']", record.clone()).unwrap(), Value::from("laptop"));
        assert_eq!(eval("item.missing", record.clone()).unwrap(), Value::Null);
        assert!(matches!(
            eval("discount", record),
            Err(ExpressionError::UnknownIdentifier { .. })
        ));
    }

    #[test]
    fn test_arithmetic_operations() {
        assert_eq!(eval("10 + 5", json!({})).unwrap(), Value::Int(15));
        assert_eq!(eval("10 - 5 * 2", json!({})).unwrap(), Value::Int(0));
        assert_eq!(eval("10 / 4", json!({})).unwrap(), Value::Float(2.5));
        assert_eq!(eval("10 / 5", json!({})).unwrap(), Value::Int(2));
        assert_eq!(eval("10 % 3", json!({})).unwrap(), Value::Int(1));
        assert_eq!(eval("1 + 0.5", json!({})).unwrap(), Value::Float(1.5));
        assert_eq!(eval("'a' + 'b'", json!({})).unwrap(), Value::from("ab"));
        assert_eq!(eval("-(2 + 3)", json!({})).unwrap(), Value::Int(-5));

        assert!(matches!(
            eval("10 / 0", json!({})),
            Err(ExpressionError::DivisionByZero)
        ));
        assert!(matches!(
            eval("10 + true", json!({})),
            Err(ExpressionError::InvalidOperandTypes { .. })
        ));
    }

    #[test]
    fn test_comparison_operations() {
        let record = json!({"price": 150, "since": "2023-01-01"});
        assert_eq!(eval("price > 100", record.clone()).unwrap(), Value::Boolean(true));
        assert_eq!(eval("price <= 100", record.clone()).unwrap(), Value::Boolean(false));
        assert_eq!(eval("price == 150.0", record.clone()).unwrap(), Value::Boolean(true));
        assert_eq!(
            eval("since > '2022-12-31'", record.clone()).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(eval("nil == nil", record.clone()).unwrap(), Value::Boolean(true));
        assert_eq!(eval("price != nil", record).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_logical_operations() {
        let record = json!({"a": true, "b": false});
        assert_eq!(eval("a && b", record.clone()).unwrap(), Value::Boolean(false));
        assert_eq!(eval("a or b", record.clone()).unwrap(), Value::Boolean(true));
        assert_eq!(eval("!b", record.clone()).unwrap(), Value::Boolean(true));
        assert_eq!(eval("not a and b", record.clone()).unwrap(), Value::Boolean(false));
        // Right side is never evaluated
        assert_eq!(eval("b && missing", record).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_membership() {
        let record = json!({"code": "B", "codes": ["A", "B"]});
        assert_eq!(eval("code in codes", record.clone()).unwrap(), Value::Boolean(true));
        assert_eq!(eval("'C' not in codes", record.clone()).unwrap(), Value::Boolean(true));
        assert_eq!(eval("'od' in 'code'", record).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_predicate_functions() {
        let bindings = json!({
            "target": {"cpt": ["A", "A", "B"]},
            "lookup": [{"code": "A"}, {"code": "C"}]
        });
        assert_eq!(
            eval("map(lookup, .code)", bindings.clone()).unwrap(),
            Value::from(json!(["A", "C"]))
        );
        assert_eq!(
            eval("filter(target.cpt, # in map(lookup, .code))", bindings.clone()).unwrap(),
            Value::from(json!(["A", "A"]))
        );
        assert_eq!(
            eval("count(target.cpt, # == 'A')", bindings.clone()).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            eval("all(target.cpt, len(#) == 1)", bindings.clone()).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            eval("any(lookup, .code == 'Z')", bindings.clone()).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            eval("none(lookup, .code == 'Z')", bindings).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_current_outside_predicate() {
        assert!(matches!(
            eval("#", json!({})),
            Err(ExpressionError::EvaluationError { .. })
        ));
    }

    #[test]
    fn test_index_evaluation() {
        let record = json!({"items": [1, 2, 3]});
        assert_eq!(eval("items[0]", record.clone()).unwrap(), Value::Int(1));
        assert_eq!(eval("items[-1]", record.clone()).unwrap(), Value::Int(3));
        assert_eq!(eval("items.1", record.clone()).unwrap(), Value::Int(2));
        assert!(matches!(
            eval("items[5]", record),
            Err(ExpressionError::IndexOutOfRange { index: 5, len: 3 })
        ));
    }
}
