// SQL lexer - tokenizes WHERE clauses

use super::error::{SqlError, SqlResult};
use super::token::{Spanned, Token};
use crate::access::{is_date_time, parse_time};

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

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> SqlResult<Spanned> {
        self.skip_whitespace();
        let position = self.position;

        let Some(ch) = self.current_char() else {
            return Ok(Spanned {
                token: Token::Eof,
                position,
            });
        };

        let token = match ch {
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            ',' => self.single(Token::Comma),
            ';' => self.single(Token::Semicolon),
            '=' => {
                self.advance();
                // `==` is accepted as a synonym
                if self.current_char() == Some('=') {
                    self.advance();
                }
                Token::Equal
            }
            '<' => {
                self.advance();
                match self.current_char() {
                    Some('=') => self.single(Token::LessEqual),
                    Some('>') => self.single(Token::NotEqual),
                    _ => Token::Less,
                }
            }
            '>' => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.single(Token::GreaterEqual)
                } else {
                    Token::Greater
                }
            }
            '!' => {
                if self.peek() != Some('=') {
                    return Err(SqlError::UnexpectedCharacter {
                        character: ch,
                        position,
                    });
                }
                self.advance();
                self.single(Token::NotEqual)
            }
            '\'' => self.read_string()?,
            '"' => self.read_quoted_identifier()?,
            '{' if self.peek() == Some('{') => self.read_variable()?,
            '-' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number()?,
            c if c.is_ascii_digit() => self.read_number()?,
            c if is_word_char(c) => self.read_identifier(),
            _ => {
                return Err(SqlError::UnexpectedCharacter {
                    character: ch,
                    position,
                })
            }
        };

        Ok(Spanned { token, position })
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    /// Read a run of word characters
    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(ch) = self.current_char() {
            if !is_word_char(ch) {
                break;
            }
            word.push(ch);
            self.advance();
        }
        word
    }

    /// Read an identifier or keyword
    ///
    /// Identifiers are field paths, so dots, `#` and dashes are part of them.
    fn read_identifier(&mut self) -> Token {
        let identifier = self.read_word();
        Token::keyword_from_str(&identifier).unwrap_or(Token::Identifier(identifier))
    }

    /// Read a quoted identifier (e.g., "order date")
    fn read_quoted_identifier(&mut self) -> SqlResult<Token> {
        let start = self.position;
        self.advance(); // Skip opening quote
        let mut identifier = String::new();

        loop {
            match self.current_char() {
                None => return Err(SqlError::UnterminatedString { position: start }),
                Some('\\') if self.peek() == Some('"') => {
                    identifier.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    return Ok(Token::Identifier(identifier));
                }
                Some(ch) => {
                    identifier.push(ch);
                    self.advance();
                }
            }
        }
    }

    /// Read a string literal
    fn read_string(&mut self) -> SqlResult<Token> {
        let start = self.position;
        self.advance(); // Skip opening quote
        let mut string = String::new();

        loop {
            match self.current_char() {
                None => return Err(SqlError::UnterminatedString { position: start }),
                Some('\'') if self.peek() == Some('\'') => {
                    string.push('\'');
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    return Ok(Token::String(string));
                }
                Some(ch) => {
                    string.push(ch);
                    self.advance();
                }
            }
        }
    }

    /// Read a `{{expr}}` template reference
    fn read_variable(&mut self) -> SqlResult<Token> {
        let start = self.position;
        self.advance();
        self.advance();
        let mut body = String::new();

        loop {
            match self.current_char() {
                None => return Err(SqlError::UnterminatedVariable { position: start }),
                Some('}') if self.peek() == Some('}') => {
                    self.advance();
                    self.advance();
                    return Ok(Token::Variable(format!("{{{{{}}}}}", body)));
                }
                Some(ch) => {
                    body.push(ch);
                    self.advance();
                }
            }
        }
    }

    /// Read a number or a date
    ///
    /// A digit run that looks like a date becomes a date token, taking a
    /// following time of day with it.
    fn read_number(&mut self) -> SqlResult<Token> {
        let start = self.position;
        let mut text = String::new();
        if self.current_char() == Some('-') {
            text.push('-');
            self.advance();
        }
        text.push_str(&self.read_word());

        if is_date_time(&text) {
            return Ok(Token::Date(self.read_time_of_day(text)));
        }
        if text.parse::<i64>().is_ok() || text.parse::<f64>().is_ok() {
            return Ok(Token::Number(text));
        }
        Err(SqlError::InvalidNumber {
            text,
            position: start,
        })
    }

    /// Extend `date` with a space-separated time of day if one follows
    fn read_time_of_day(&mut self, date: String) -> String {
        let checkpoint = self.position;
        self.skip_whitespace();
        if self.position == checkpoint || !self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.position = checkpoint;
            return date;
        }

        let combined = format!("{} {}", date, self.read_word());
        if is_date_time(&combined) && parse_time(&combined).is_some() {
            combined
        } else {
            self.position = checkpoint;
            date
        }
    }

    /// Tokenize the entire input, merging compound operators
    pub fn tokenize(&mut self) -> SqlResult<Vec<Spanned>> {
        let mut tokens = Vec::new();

        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                break;
            }
        }

        let tokens = merge_compound(tokens);
        log::trace!(
            "tokens: {:?}",
            tokens.iter().map(|s| &s.token).collect::<Vec<_>>()
        );
        Ok(tokens)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '#' | '$' | '-' | ':' | '+' | '/' | '%' | '@')
}

/// Merge adjacent keywords into compound operators
///
/// `NOT LIKE`, `NOT IN`, `NOT BETWEEN`, `IS NULL` and `IS NOT NULL`. A `NOT`
/// that does not start a compound stays a prefix negation.
fn merge_compound(tokens: Vec<Spanned>) -> Vec<Spanned> {
    let mut merged: Vec<Spanned> = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();

    while let Some(current) = iter.next() {
        if current.token == Token::Is {
            let is_not = iter.peek().is_some_and(|next| next.token == Token::Not);
            if is_not {
                // IS NOT NULL needs a lookahead of two
                let not = iter.next();
                if iter.peek().is_some_and(|next| next.token == Token::Null) {
                    iter.next();
                    merged.push(Spanned {
                        token: Token::IsNotNull,
                        position: current.position,
                    });
                    continue;
                }
                merged.push(current);
                merged.extend(not);
                continue;
            }
        }

        let compound = iter.peek().and_then(|next| current.token.merge(&next.token));
        match compound {
            Some(token) => {
                iter.next();
                merged.push(Spanned {
                    token,
                    position: current.position,
                });
            }
            None => merged.push(current),
        }
    }

    merged
}
