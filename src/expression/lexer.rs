// Expression lexer - tokenizes expression source text

use super::error::{ExpressionError, ExpressionResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Int(i64),
    Float(f64),
    String(String),
    Identifier(String),

    // Punctuation
    Hash,
    Dot,
    Comma,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqualEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AndAnd,
    OrOr,
    Bang,

    Eof,
}

/// A token and the character offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> ExpressionResult<Spanned> {
        self.skip_whitespace();
        let start = self.position;

        let Some(ch) = self.current_char() else {
            return Ok(Spanned {
                token: Token::Eof,
                position: start,
            });
        };

        let token = match ch {
            '#' => self.single(Token::Hash),
            '.' => self.single(Token::Dot),
            ',' => self.single(Token::Comma),
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '[' => self.single(Token::LeftBracket),
            ']' => self.single(Token::RightBracket),
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '*' => self.single(Token::Star),
            '/' => self.single(Token::Slash),
            '%' => self.single(Token::Percent),
            '=' => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                }
                Token::EqualEqual
            }
            '!' => self.pair('=', Token::NotEqual, Token::Bang),
            '<' => self.pair('=', Token::LessEqual, Token::Less),
            '>' => self.pair('=', Token::GreaterEqual, Token::Greater),
            '&' => {
                self.advance();
                if self.current_char() != Some('&') {
                    return Err(ExpressionError::syntax(start, "expected '&&'"));
                }
                self.advance();
                Token::AndAnd
            }
            '|' => {
                self.advance();
                if self.current_char() != Some('|') {
                    return Err(ExpressionError::syntax(start, "expected '||'"));
                }
                self.advance();
                Token::OrOr
            }
            '\'' | '"' => self.read_string(ch)?,
            c if c.is_ascii_digit() => self.read_number()?,
            c if c.is_alphabetic() || c == '_' || c == '$' => self.read_identifier(),
            c => {
                return Err(ExpressionError::syntax(
                    start,
                    format!("unexpected character '{}'", c),
                ))
            }
        };

        Ok(Spanned {
            token,
            position: start,
        })
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn pair(&mut self, second: char, double: Token, single: Token) -> Token {
        self.advance();
        if self.current_char() == Some(second) {
            self.advance();
            double
        } else {
            single
        }
    }

    fn read_identifier(&mut self) -> Token {
        let mut identifier = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Token::Identifier(identifier)
    }

    fn read_string(&mut self, quote: char) -> ExpressionResult<Token> {
        let start = self.position;
        self.advance(); // Skip opening quote
        let mut string = String::new();

        loop {
            match self.current_char() {
                None => return Err(ExpressionError::syntax(start, "unterminated string")),
                Some(ch) if ch == quote => {
                    self.advance();
                    return Ok(Token::String(string));
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.current_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some(other) => other,
                        None => return Err(ExpressionError::syntax(start, "unterminated string")),
                    };
                    string.push(escaped);
                    self.advance();
                }
                Some(ch) => {
                    string.push(ch);
                    self.advance();
                }
            }
        }
    }

    fn read_number(&mut self) -> ExpressionResult<Token> {
        let start = self.position;
        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() || ch == '_' {
                if ch != '_' {
                    number.push(ch);
                }
                self.advance();
            } else if ch == '.' && !is_float && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                number.push(ch);
                self.advance();
            } else if (ch == 'e' || ch == 'E')
                && self
                    .peek()
                    .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
            {
                is_float = true;
                number.push(ch);
                self.advance();
                if let Some(sign @ ('-' | '+')) = self.current_char() {
                    number.push(sign);
                    self.advance();
                }
            } else {
                break;
            }
        }

        if is_float {
            number
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| ExpressionError::syntax(start, format!("invalid number '{}'", number)))
        } else {
            number
                .parse::<i64>()
                .map(Token::Int)
                .map_err(|_| ExpressionError::syntax(start, format!("invalid number '{}'", number)))
        }
    }

    /// Tokenize the entire input, ending with `Eof`
    pub fn tokenize(&mut self) -> ExpressionResult<Vec<Spanned>> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            tokens("len(data) >= 2"),
            vec![
                Token::Identifier("len".to_string()),
                Token::LeftParen,
                Token::Identifier("data".to_string()),
                Token::RightParen,
                Token::GreaterEqual,
                Token::Int(2),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_strings_and_numbers() {
        assert_eq!(
            tokens(r#"'it\'s' "x" 1.5 2e3 7"#),
            vec![
                Token::String("it's".to_string()),
                Token::String("x".to_string()),
                Token::Float(1.5),
                Token::Float(2000.0),
                Token::Int(7),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokens("a == b != c && !d || e <= f"),
            vec![
                Token::Identifier("a".to_string()),
                Token::EqualEqual,
                Token::Identifier("b".to_string()),
                Token::NotEqual,
                Token::Identifier("c".to_string()),
                Token::AndAnd,
                Token::Bang,
                Token::Identifier("d".to_string()),
                Token::OrOr,
                Token::Identifier("e".to_string()),
                Token::LessEqual,
                Token::Identifier("f".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_member_and_current() {
        assert_eq!(
            tokens("#.code"),
            vec![
                Token::Hash,
                Token::Dot,
                Token::Identifier("code".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Lexer::new("'open").tokenize(),
            Err(ExpressionError::Syntax { position: 0, .. })
        ));
        assert!(matches!(
            Lexer::new("a & b").tokenize(),
            Err(ExpressionError::Syntax { position: 2, .. })
        ));
        assert!(Lexer::new("a @ b").tokenize().is_err());
    }
}
