use thiserror::Error;

/// Reasons a filter cannot be evaluated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Filter field path is empty")]
    EmptyField,

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Unknown boolean operator: {0}")]
    UnknownBooleanOp(String),

    #[error("Operator between requires a list of exactly two values, got {0}")]
    BetweenArity(String),

    #[error("Operator {0} requires a list of values")]
    MembershipLiteral(String),

    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid expression '{source_text}': {message}")]
    InvalidExpression { source_text: String, message: String },

    #[error("Operator {operator} requires an integer threshold, got {found}")]
    InvalidThreshold { operator: String, found: String },

    #[error("Lookup must have exactly one of data or handler")]
    InvalidLookup,
}

pub type FilterResult<T> = Result<T, FilterError>;
