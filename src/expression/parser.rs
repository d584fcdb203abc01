// Expression parser - converts tokens to an expression tree

use super::error::{ExpressionError, ExpressionResult};
use super::expr::Expression;
use super::lexer::{Lexer, Spanned, Token};
use super::operator::{BinaryOperator, UnaryOperator};
use crate::access::Value;

pub struct Parser {
    tokens: Vec<Spanned>,
    position: usize,
}

impl Parser {
    pub fn new(source: &str) -> ExpressionResult<Self> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Parser {
            tokens,
            position: 0,
        })
    }

    /// Parse the whole input as a single expression
    pub fn parse(&mut self) -> ExpressionResult<Expression> {
        if self.match_token(&Token::Eof) {
            return Err(self.error("empty expression"));
        }
        let expr = self.parse_or()?;
        if !self.match_token(&Token::Eof) {
            return Err(self.error(format!("unexpected {:?}", self.current_token())));
        }
        Ok(expr)
    }

    /// Parse OR expression
    fn parse_or(&mut self) -> ExpressionResult<Expression> {
        let mut left = self.parse_and()?;

        while self.match_token(&Token::OrOr) || self.match_keyword("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expression::binary_op(BinaryOperator::Or, left, right);
        }

        Ok(left)
    }

    /// Parse AND expression
    fn parse_and(&mut self) -> ExpressionResult<Expression> {
        let mut left = self.parse_not()?;

        while self.match_token(&Token::AndAnd) || self.match_keyword("and") {
            self.advance();
            let right = self.parse_not()?;
            left = Expression::binary_op(BinaryOperator::And, left, right);
        }

        Ok(left)
    }

    /// Parse NOT expression
    fn parse_not(&mut self) -> ExpressionResult<Expression> {
        if self.match_token(&Token::Bang) || self.match_keyword("not") {
            self.advance();
            let operand = self.parse_not()?;
            Ok(Expression::unary_op(UnaryOperator::Not, operand))
        } else {
            self.parse_comparison()
        }
    }

    /// Parse comparison expression
    fn parse_comparison(&mut self) -> ExpressionResult<Expression> {
        let left = self.parse_addition()?;

        let op = match self.current_token() {
            Token::EqualEqual => Some(BinaryOperator::Eq),
            Token::NotEqual => Some(BinaryOperator::Ne),
            Token::Less => Some(BinaryOperator::Lt),
            Token::LessEqual => Some(BinaryOperator::Le),
            Token::Greater => Some(BinaryOperator::Gt),
            Token::GreaterEqual => Some(BinaryOperator::Ge),
            Token::Identifier(word) if word == "in" => Some(BinaryOperator::In),
            Token::Identifier(word) if word == "not" => {
                if self.peek_token() == Token::Identifier("in".to_string()) {
                    self.advance();
                    Some(BinaryOperator::NotIn)
                } else {
                    return Err(self.error("expected 'in' after 'not'"));
                }
            }
            _ => None,
        };

        match op {
            Some(op) => {
                self.advance();
                let right = self.parse_addition()?;
                Ok(Expression::binary_op(op, left, right))
            }
            None => Ok(left),
        }
    }

    /// Parse addition/subtraction expression
    fn parse_addition(&mut self) -> ExpressionResult<Expression> {
        let mut left = self.parse_multiplication()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplication()?;
            left = Expression::binary_op(op, left, right);
        }

        Ok(left)
    }

    /// Parse multiplication/division expression
    fn parse_multiplication(&mut self) -> ExpressionResult<Expression> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Mul,
                Token::Slash => BinaryOperator::Div,
                Token::Percent => BinaryOperator::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::binary_op(op, left, right);
        }

        Ok(left)
    }

    /// Parse unary expression
    fn parse_unary(&mut self) -> ExpressionResult<Expression> {
        match self.current_token() {
            Token::Minus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(match operand {
                    Expression::Literal(Value::Int(n)) => Expression::Literal(Value::Int(-n)),
                    Expression::Literal(Value::Float(f)) => Expression::Literal(Value::Float(-f)),
                    other => Expression::unary_op(UnaryOperator::Minus, other),
                })
            }
            Token::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_postfix(),
        }
    }

    /// Parse member access, indexing and calls following a primary
    fn parse_postfix(&mut self) -> ExpressionResult<Expression> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.current_token() {
                Token::Dot => {
                    self.advance();
                    expr = match self.current_token() {
                        Token::Identifier(name) => {
                            self.advance();
                            Expression::member(expr, name)
                        }
                        Token::Int(n) => {
                            self.advance();
                            Expression::index(expr, Expression::literal(n))
                        }
                        _ => return Err(self.error("expected member name after '.'")),
                    };
                }
                Token::LeftBracket => {
                    self.advance();
                    let index = self.parse_or()?;
                    self.expect_token(Token::RightBracket)?;
                    expr = Expression::index(expr, index);
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Parse primary expression
    fn parse_primary(&mut self) -> ExpressionResult<Expression> {
        match self.current_token() {
            Token::Int(n) => {
                self.advance();
                Ok(Expression::literal(n))
            }
            Token::Float(f) => {
                self.advance();
                Ok(Expression::literal(f))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expression::literal(s))
            }
            Token::Hash => {
                self.advance();
                Ok(Expression::Current)
            }
            Token::Dot => {
                // `.field` is shorthand for `#.field`
                self.advance();
                match self.current_token() {
                    Token::Identifier(name) => {
                        self.advance();
                        Ok(Expression::member(Expression::Current, name))
                    }
                    _ => Err(self.error("expected member name after '.'")),
                }
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_or()?;
                self.expect_token(Token::RightParen)?;
                Ok(expr)
            }
            Token::LeftBracket => {
                self.advance();
                let items = self.parse_expression_list(Token::RightBracket)?;
                Ok(Expression::Array(items))
            }
            Token::Identifier(name) => {
                self.advance();
                match name.as_str() {
                    "true" => return Ok(Expression::literal(true)),
                    "false" => return Ok(Expression::literal(false)),
                    "nil" | "null" => return Ok(Expression::Literal(Value::Null)),
                    _ => {}
                }
                if self.match_token(&Token::LeftParen) {
                    self.advance();
                    let args = self.parse_expression_list(Token::RightParen)?;
                    Ok(Expression::call(name, args))
                } else {
                    Ok(Expression::identifier(name))
                }
            }
            Token::Eof => Err(self.error("unexpected end of expression")),
            other => Err(self.error(format!("unexpected {:?}", other))),
        }
    }

    /// Parse a comma-separated list up to and including `close`
    fn parse_expression_list(&mut self, close: Token) -> ExpressionResult<Vec<Expression>> {
        let mut items = Vec::new();
        if self.match_token(&close) {
            self.advance();
            return Ok(items);
        }

        loop {
            items.push(self.parse_or()?);
            if self.match_token(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect_token(close)?;
        Ok(items)
    }

    // Helper methods

    /// Get current token
    fn current_token(&self) -> Token {
        self.tokens
            .get(self.position)
            .map(|s| s.token.clone())
            .unwrap_or(Token::Eof)
    }

    fn peek_token(&self) -> Token {
        self.tokens
            .get(self.position + 1)
            .map(|s| s.token.clone())
            .unwrap_or(Token::Eof)
    }

    /// Advance to next token
    fn advance(&mut self) {
        if self.position < self.tokens.len().saturating_sub(1) {
            self.position += 1;
        }
    }

    /// Check if current token matches
    fn match_token(&self, token: &Token) -> bool {
        self.current_token() == *token
    }

    fn match_keyword(&self, keyword: &str) -> bool {
        matches!(self.current_token(), Token::Identifier(word) if word == keyword)
    }

    /// Expect a specific token
    fn expect_token(&mut self, token: Token) -> ExpressionResult<()> {
        if self.current_token() == token {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {:?}, found {:?}",
                token,
                self.current_token()
            )))
        }
    }

    fn error(&self, message: impl Into<String>) -> ExpressionError {
        let position = self
            .tokens
            .get(self.position)
            .map_or(0, |s| s.position);
        ExpressionError::syntax(position, message)
    }
}

/// Parse expression source text into a tree
pub fn parse(source: &str) -> ExpressionResult<Expression> {
    Parser::new(source)?.parse()
}
