// SQL tokens for lexical analysis of WHERE clauses

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Identifier(String),
    String(String),
    Number(String),
    Date(String),
    Boolean(bool),
    /// `{{expr}}` template, braces included
    Variable(String),

    // Keywords
    And,
    Or,
    Not,
    Is,
    Null,
    Like,
    In,
    Between,

    // Comparison operators
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,

    // Compound operators, produced by merging adjacent keywords
    NotLike,
    NotIn,
    NotBetween,
    IsNull,
    IsNotNull,

    // Delimiters
    LeftParen,
    RightParen,
    Comma,
    Semicolon,

    Eof,
}

impl Token {
    /// Check if the token can stand between a field and its value
    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            Token::Equal
                | Token::NotEqual
                | Token::Less
                | Token::Greater
                | Token::LessEqual
                | Token::GreaterEqual
                | Token::Like
                | Token::In
                | Token::Between
                | Token::NotLike
                | Token::NotIn
                | Token::NotBetween
                | Token::IsNull
                | Token::IsNotNull
        )
    }

    /// Convert a bare word to a keyword or boolean token if it is one
    pub fn keyword_from_str(s: &str) -> Option<Token> {
        match s.to_uppercase().as_str() {
            "AND" => Some(Token::And),
            "OR" => Some(Token::Or),
            "NOT" => Some(Token::Not),
            "IS" => Some(Token::Is),
            "NULL" => Some(Token::Null),
            "LIKE" => Some(Token::Like),
            "IN" => Some(Token::In),
            "BETWEEN" => Some(Token::Between),
            "TRUE" => Some(Token::Boolean(true)),
            "FALSE" => Some(Token::Boolean(false)),
            _ => None,
        }
    }

    /// Compound operator formed by `self` followed by `next`
    pub fn merge(&self, next: &Token) -> Option<Token> {
        match (self, next) {
            (Token::Not, Token::Like) => Some(Token::NotLike),
            (Token::Not, Token::In) => Some(Token::NotIn),
            (Token::Not, Token::Between) => Some(Token::NotBetween),
            (Token::Is, Token::Null) => Some(Token::IsNull),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(s) => write!(f, "identifier '{}'", s),
            Token::String(s) => write!(f, "string '{}'", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Date(d) => write!(f, "date {}", d),
            Token::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Token::Variable(v) => write!(f, "template {}", v),
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
            Token::Not => write!(f, "NOT"),
            Token::Is => write!(f, "IS"),
            Token::Null => write!(f, "NULL"),
            Token::Like => write!(f, "LIKE"),
            Token::In => write!(f, "IN"),
            Token::Between => write!(f, "BETWEEN"),
            Token::Equal => write!(f, "'='"),
            Token::NotEqual => write!(f, "'!='"),
            Token::Less => write!(f, "'<'"),
            Token::Greater => write!(f, "'>'"),
            Token::LessEqual => write!(f, "'<='"),
            Token::GreaterEqual => write!(f, "'>='"),
            Token::NotLike => write!(f, "NOT LIKE"),
            Token::NotIn => write!(f, "NOT IN"),
            Token::NotBetween => write!(f, "NOT BETWEEN"),
            Token::IsNull => write!(f, "IS NULL"),
            Token::IsNotNull => write!(f, "IS NOT NULL"),
            Token::LeftParen => write!(f, "'('"),
            Token::RightParen => write!(f, "')'"),
            Token::Comma => write!(f, "','"),
            Token::Semicolon => write!(f, "';'"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// A token and the character offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}
