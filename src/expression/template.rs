//! `{{expr}}` template references.
//!
//! A string that is exactly one template evaluates to the expression's value
//! with its own type. A string with templates embedded in other text is
//! interpolated and stays a string.

use super::error::{ExpressionError, ExpressionResult};
use super::eval;
use crate::access::Value;

pub const OPEN: &str = "{{";
pub const CLOSE: &str = "}}";

/// Check if `s` carries a template marker
pub fn is_template(s: &str) -> bool {
    s.contains(OPEN)
}

/// Inner expression of a string that is exactly one template
pub fn template_source(s: &str) -> Option<&str> {
    let inner = s.trim().strip_prefix(OPEN)?.strip_suffix(CLOSE)?;
    (!inner.contains(OPEN) && !inner.contains(CLOSE)).then(|| inner.trim())
}

/// Evaluate the templates in `s` against `bindings`
pub fn render(s: &str, bindings: &Value) -> ExpressionResult<Value> {
    if let Some(source) = template_source(s) {
        return eval(source, bindings);
    }

    let mut out = String::new();
    let mut rest = s;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        let end = after.find(CLOSE).ok_or_else(|| {
            ExpressionError::evaluation(format!("unterminated template in '{}'", s))
        })?;
        let value = eval(after[..end].trim(), bindings)?;
        out.push_str(&value.to_string());
        rest = &after[end + CLOSE.len()..];
    }
    out.push_str(rest);
    Ok(Value::String(out))
}

/// Resolve templates in a literal, recursing into arrays
pub fn resolve_literal(literal: &Value, bindings: &Value) -> ExpressionResult<Value> {
    match literal {
        Value::String(s) if is_template(s) => render(s, bindings),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_literal(item, bindings))
            .collect::<ExpressionResult<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}
