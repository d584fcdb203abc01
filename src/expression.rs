//! Expression language used by templates, the expression operator and lookups.
//!
//! This module provides:
//! - Lexer and recursive-descent parser for expression source text
//! - Expression AST representation
//! - Evaluation against a bindings map, with `#` bound inside predicates
//! - Built-in functions and a process-wide function registry
//! - `{{expr}}` template rendering

pub mod error;
pub mod eval;
pub mod expr;
pub mod function;
pub mod lexer;
pub mod operator;
pub mod parser;
pub mod template;

pub use error::{ExpressionError, ExpressionResult};
pub use eval::{evaluate_expression, values_equal, ExpressionEvaluator};
pub use expr::Expression;
pub use function::{call_function, register_function, Function};
pub use operator::{BinaryOperator, UnaryOperator};
pub use parser::{parse, Parser};
pub use template::{is_template, render, resolve_literal, template_source};

use crate::access::Value;

/// Parse and evaluate `source` against `bindings`
pub fn eval(source: &str, bindings: &Value) -> ExpressionResult<Value> {
    let expr = parse(source)?;
    log::trace!("evaluating expression {:?}", expr);
    evaluate_expression(&expr, bindings)
}
