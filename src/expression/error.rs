//! Error types for expression parsing and evaluation.

use crate::access::DataType;
use std::fmt;

/// Errors that can occur while parsing or evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// Malformed source text
    Syntax { position: usize, message: String },

    /// Invalid operand types for operator
    InvalidOperandTypes {
        operator: String,
        left_type: Option<DataType>,
        right_type: Option<DataType>,
    },

    /// Identifier not present in the bindings
    UnknownIdentifier { name: String },

    /// Invalid function name
    UnknownFunction { name: String },

    /// Wrong number of function arguments
    FunctionArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    /// Division by zero
    DivisionByZero,

    /// Array index outside the array
    IndexOutOfRange { index: i64, len: usize },

    /// Generic evaluation error
    EvaluationError { message: String },
}

impl ExpressionError {
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        ExpressionError::Syntax {
            position,
            message: message.into(),
        }
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        ExpressionError::EvaluationError {
            message: message.into(),
        }
    }
}

fn type_name(data_type: &Option<DataType>) -> &'static str {
    data_type.as_ref().map_or("null", DataType::as_str)
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionError::Syntax { position, message } => {
                write!(f, "syntax error at {}: {}", position, message)
            }

            ExpressionError::InvalidOperandTypes {
                operator,
                left_type,
                right_type: None,
            } => write!(f, "cannot apply {} to {}", operator, type_name(left_type)),

            ExpressionError::InvalidOperandTypes {
                operator,
                left_type,
                right_type,
            } => write!(
                f,
                "cannot apply {} to {} and {}",
                operator,
                type_name(left_type),
                type_name(right_type)
            ),

            ExpressionError::UnknownIdentifier { name } => {
                write!(f, "unknown identifier '{}'", name)
            }
            ExpressionError::UnknownFunction { name } => write!(f, "unknown function '{}'", name),

            ExpressionError::FunctionArgumentCount {
                function,
                expected,
                actual,
            } => write!(
                f,
                "{}() takes {} argument(s), got {}",
                function, expected, actual
            ),

            ExpressionError::DivisionByZero => f.write_str("division by zero"),

            ExpressionError::IndexOutOfRange { index, len } => {
                write!(f, "index {} out of range for length {}", index, len)
            }

            ExpressionError::EvaluationError { message } => f.write_str(message),
        }
    }
}

impl std::error::Error for ExpressionError {}

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExpressionError::syntax(4, "unexpected ')'");
        assert_eq!(err.to_string(), "syntax error at 4: unexpected ')'");

        let err = ExpressionError::InvalidOperandTypes {
            operator: "+".to_string(),
            left_type: Some(DataType::Int),
            right_type: None,
        };
        assert_eq!(err.to_string(), "cannot apply + to int");

        let err = ExpressionError::FunctionArgumentCount {
            function: "len".to_string(),
            expected: 1,
            actual: 2,
        };
        assert_eq!(err.to_string(), "len() takes 1 argument(s), got 2");

        let err = ExpressionError::evaluation("lookup is not a sequence");
        assert_eq!(err.to_string(), "lookup is not a sequence");
    }
}
