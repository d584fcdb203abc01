//! Expression AST definitions.

use crate::access::Value;
use crate::expression::operator::{BinaryOperator, UnaryOperator};

/// Expression tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal constant value
    Literal(Value),

    /// Name looked up in the bindings
    Identifier(String),

    /// `#`, the element currently visited by a predicate function
    Current,

    /// `[a, b, ...]`
    Array(Vec<Expression>),

    /// `object.name`
    Member {
        object: Box<Expression>,
        name: String,
    },

    /// `object[index]`
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
    },

    /// `name(args...)`
    Call { name: String, args: Vec<Expression> },

    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
}

impl Expression {
    /// Create a literal expression
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    /// Create an identifier expression
    pub fn identifier(name: impl Into<String>) -> Self {
        Expression::Identifier(name.into())
    }

    /// Create a member access expression
    pub fn member(object: Expression, name: impl Into<String>) -> Self {
        Expression::Member {
            object: Box::new(object),
            name: name.into(),
        }
    }

    /// Create an index expression
    pub fn index(object: Expression, index: Expression) -> Self {
        Expression::Index {
            object: Box::new(object),
            index: Box::new(index),
        }
    }

    /// Create a function call expression
    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Call {
            name: name.into(),
            args,
        }
    }

    /// Create a binary operation expression
    pub fn binary_op(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create a unary operation expression
    pub fn unary_op(op: UnaryOperator, operand: Expression) -> Self {
        Expression::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Check if this expression refers to the current element anywhere
    pub fn uses_current(&self) -> bool {
        match self {
            Expression::Current => true,
            Expression::Literal(_) | Expression::Identifier(_) => false,
            Expression::Array(items) => items.iter().any(Expression::uses_current),
            Expression::Member { object, .. } => object.uses_current(),
            Expression::Index { object, index } => object.uses_current() || index.uses_current(),
            Expression::Call { args, .. } => args.iter().any(Expression::uses_current),
            Expression::BinaryOp { left, right, .. } => {
                left.uses_current() || right.uses_current()
            }
            Expression::UnaryOp { operand, .. } => operand.uses_current(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_builders() {
        let expr = Expression::binary_op(
            BinaryOperator::Gt,
            Expression::call("len", vec![Expression::identifier("data")]),
            Expression::literal(1),
        );
        match &expr {
            Expression::BinaryOp { op, left, right } => {
                assert_eq!(*op, BinaryOperator::Gt);
                assert_eq!(
                    **left,
                    Expression::Call {
                        name: "len".to_string(),
                        args: vec![Expression::Identifier("data".to_string())]
                    }
                );
                assert_eq!(**right, Expression::Literal(Value::Int(1)));
            }
            _ => panic!("Expected BinaryOp"),
        }
    }

    #[test]
    fn test_uses_current() {
        assert!(Expression::member(Expression::Current, "code").uses_current());
        assert!(!Expression::member(Expression::identifier("target"), "code").uses_current());
        assert!(Expression::unary_op(UnaryOperator::Not, Expression::Current).uses_current());
    }
}
