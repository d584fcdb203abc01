use thiserror::Error;

use crate::condition::FilterError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SqlError {
    #[error("empty WHERE clause")]
    EmptyClause,

    #[error("unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },

    #[error("unterminated template starting at position {position}")]
    UnterminatedVariable { position: usize },

    #[error("unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },

    #[error("invalid number '{text}' at position {position}")]
    InvalidNumber { text: String, position: usize },

    #[error("expected {expected} at position {position}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: usize,
    },

    #[error("invalid condition on '{field}': {source}")]
    InvalidFilter {
        field: String,
        #[source]
        source: FilterError,
    },
}

pub type SqlResult<T> = Result<T, SqlError>;
