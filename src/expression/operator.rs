//! Expression operators.

use std::cmp::Ordering;
use std::fmt;

/// Infix operators, grouped by the parser level that produces them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Or,
    And,

    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,

    Add,
    Sub,

    Mul,
    Div,
    Mod,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Or => "||",
            BinaryOperator::And => "&&",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::In => "in",
            BinaryOperator::NotIn => "not in",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
        }
    }

    /// Whether an ordering of the operands satisfies this operator
    ///
    /// `None` for operators that are not ordering comparisons.
    pub fn accepts(&self, ordering: Ordering) -> Option<bool> {
        match self {
            BinaryOperator::Lt => Some(ordering == Ordering::Less),
            BinaryOperator::Le => Some(ordering != Ordering::Greater),
            BinaryOperator::Gt => Some(ordering == Ordering::Greater),
            BinaryOperator::Ge => Some(ordering != Ordering::Less),
            _ => None,
        }
    }

    /// Result decided by the left operand alone, for `&&` and `||`
    pub fn short_circuit(&self, left_truthy: bool) -> Option<bool> {
        match (self, left_truthy) {
            (BinaryOperator::And, false) => Some(false),
            (BinaryOperator::Or, true) => Some(true),
            _ => None,
        }
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Minus,
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::Minus => "-",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_ordering() {
        assert_eq!(BinaryOperator::Le.accepts(Ordering::Equal), Some(true));
        assert_eq!(BinaryOperator::Lt.accepts(Ordering::Equal), Some(false));
        assert_eq!(BinaryOperator::Ge.accepts(Ordering::Greater), Some(true));
        assert_eq!(BinaryOperator::Eq.accepts(Ordering::Equal), None);
    }

    #[test]
    fn test_short_circuit() {
        assert_eq!(BinaryOperator::And.short_circuit(false), Some(false));
        assert_eq!(BinaryOperator::And.short_circuit(true), None);
        assert_eq!(BinaryOperator::Or.short_circuit(true), Some(true));
        assert_eq!(BinaryOperator::Add.short_circuit(true), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(BinaryOperator::NotIn.to_string(), "not in");
        assert_eq!(UnaryOperator::Not.to_string(), "!");
    }
}
