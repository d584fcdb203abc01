// SQL parser - converts WHERE-clause tokens to a rule tree

use super::error::{SqlError, SqlResult};
use super::lexer::Lexer;
use super::token::{Spanned, Token};
use crate::access::Value;
use crate::condition::{BooleanOp, Condition, Filter, Operator, Rule};
use crate::expression::is_template;

/// Recursive-descent parser for WHERE clauses
///
/// ```text
/// chain  := term ((AND | OR) term)*
/// term   := NOT term | '(' chain ')' | field predicate
/// ```
///
/// A chain becomes a [`Rule`] folded from its first term, so the clause
/// `a AND b OR c` evaluates as `a AND (b OR c)`. Each parenthesised chain is
/// a nested rule.
pub struct Parser {
    tokens: Vec<Spanned>,
    position: usize,
}

impl Parser {
    pub fn new(clause: &str) -> SqlResult<Self> {
        let tokens = Lexer::new(clause).tokenize()?;
        Ok(Parser {
            tokens,
            position: 0,
        })
    }

    /// Parse the whole clause
    pub fn parse(&mut self) -> SqlResult<Rule> {
        if self.match_token(&Token::Eof) || self.match_token(&Token::Semicolon) {
            return Err(SqlError::EmptyClause);
        }

        let rule = self.parse_chain()?;

        if self.match_token(&Token::Semicolon) {
            self.advance();
        }
        if !self.match_token(&Token::Eof) {
            return Err(self.unexpected("AND, OR or end of clause"));
        }
        Ok(rule)
    }

    fn parse_chain(&mut self) -> SqlResult<Rule> {
        let mut links = Vec::new();

        loop {
            let condition = self.parse_term()?;
            let operator = match self.current_token() {
                Token::And => BooleanOp::And,
                Token::Or => BooleanOp::Or,
                _ => {
                    links.push((condition, BooleanOp::And));
                    break;
                }
            };
            self.advance();
            links.push((condition, operator));
        }

        Rule::from_links(links).ok_or_else(|| self.unexpected("condition"))
    }

    fn parse_term(&mut self) -> SqlResult<Condition> {
        match self.current_token() {
            Token::Not => {
                self.advance();
                Ok(self.parse_term()?.negated())
            }
            Token::LeftParen => {
                self.advance();
                if self.match_token(&Token::RightParen) {
                    return Err(self.unexpected("condition"));
                }
                let rule = self.parse_chain()?;
                self.expect_token(Token::RightParen)?;
                Ok(rule.into())
            }
            Token::Identifier(field) => {
                self.advance();
                let filter = self.parse_predicate(field)?;
                Ok(filter.into())
            }
            _ => Err(self.unexpected("field name")),
        }
    }

    /// Parse the operator and value(s) following a field name
    fn parse_predicate(&mut self, field: String) -> SqlResult<Filter> {
        let operator = self.current_token();
        if !operator.is_operator() {
            return Err(self.unexpected("comparison operator"));
        }
        let position = self.current_position();
        self.advance();

        let filter = match operator {
            Token::Equal => Filter::new(field, Operator::Equal, self.parse_value()?),
            Token::NotEqual => Filter::new(field, Operator::NotEqual, self.parse_value()?),
            Token::Less => Filter::new(field, Operator::LessThan, self.parse_value()?),
            Token::LessEqual => Filter::new(field, Operator::LessThanEqual, self.parse_value()?),
            Token::Greater => Filter::new(field, Operator::GreaterThan, self.parse_value()?),
            Token::GreaterEqual => {
                Filter::new(field, Operator::GreaterThanEqual, self.parse_value()?)
            }
            Token::Between => Filter::new(field, Operator::Between, self.parse_range()?),
            Token::NotBetween => {
                Filter::new(field, Operator::Between, self.parse_range()?).negated()
            }
            Token::In => Filter::new(field, Operator::In, self.parse_list()?),
            Token::NotIn => Filter::new(field, Operator::NotIn, self.parse_list()?),
            Token::Like => self.parse_like(field, false)?,
            Token::NotLike => self.parse_like(field, true)?,
            Token::IsNull => Filter::new(field, Operator::IsNull, Value::Null),
            Token::IsNotNull => Filter::new(field, Operator::NotNull, Value::Null),
            other => {
                return Err(SqlError::UnexpectedToken {
                    expected: "comparison operator".to_string(),
                    found: other.to_string(),
                    position,
                })
            }
        };

        filter
            .validate()
            .map_err(|source| SqlError::InvalidFilter {
                field: filter.field().to_string(),
                source,
            })?;
        Ok(filter)
    }

    /// Parse a single comparison value
    fn parse_value(&mut self) -> SqlResult<Value> {
        let value = match self.current_token() {
            Token::String(s) | Token::Identifier(s) | Token::Date(s) | Token::Variable(s) => {
                Value::String(s)
            }
            Token::Boolean(b) => Value::Boolean(b),
            Token::Number(n) => match n.parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => n
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| SqlError::InvalidNumber {
                        text: n.clone(),
                        position: self.current_position(),
                    })?,
            },
            _ => return Err(self.unexpected("value")),
        };
        self.advance();
        Ok(value)
    }

    /// Parse `low AND high` after BETWEEN
    fn parse_range(&mut self) -> SqlResult<Value> {
        let low = self.parse_value()?;
        self.expect_token(Token::And)?;
        let high = self.parse_value()?;
        Ok(Value::Array(vec![low, high]))
    }

    /// Parse a parenthesised, comma-separated value list after IN
    fn parse_list(&mut self) -> SqlResult<Value> {
        self.expect_token(Token::LeftParen)?;
        let mut values = vec![self.parse_value()?];
        while self.match_token(&Token::Comma) {
            self.advance();
            values.push(self.parse_value()?);
        }
        self.expect_token(Token::RightParen)?;
        Ok(Value::Array(values))
    }

    /// Translate a LIKE pattern into the matching string operator
    ///
    /// `%x%` is a contains test, `%x` an ends-with test and `x%` a starts-with
    /// test. Wildcards anywhere else turn the pattern into an anchored,
    /// case-insensitive regular expression; no wildcard at all, or a template,
    /// is equality.
    fn parse_like(&mut self, field: String, negated: bool) -> SqlResult<Filter> {
        let pattern = match self.parse_value()? {
            Value::String(s) => s,
            other => other.to_string(),
        };

        if is_template(&pattern) {
            let operator = if negated { Operator::NotEqual } else { Operator::Equal };
            return Ok(Filter::new(field, operator, pattern));
        }

        let leading = pattern.starts_with('%');
        let trailing = pattern.len() > 1 && pattern.ends_with('%');
        let inner = pattern.trim_matches('%');

        if inner.contains(['%', '_']) {
            let filter = Filter::new(field, Operator::Pattern, like_to_regex(&pattern));
            return Ok(if negated { filter.negated() } else { filter });
        }

        let operator = match (leading, trailing, negated) {
            (true, true, false) => Operator::Contains,
            (true, true, true) => Operator::NotContains,
            (true, false, false) => Operator::EndsWith,
            (true, false, true) => Operator::NotEndsWith,
            (false, true, false) => Operator::StartsWith,
            (false, true, true) => Operator::NotStartsWith,
            (false, false, false) => Operator::Equal,
            (false, false, true) => Operator::NotEqual,
        };
        Ok(Filter::new(field, operator, inner))
    }

    fn current_token(&self) -> Token {
        self.tokens
            .get(self.position)
            .map(|s| s.token.clone())
            .unwrap_or(Token::Eof)
    }

    fn current_position(&self) -> usize {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map_or(0, |s| s.position)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn match_token(&self, token: &Token) -> bool {
        self.tokens
            .get(self.position)
            .is_some_and(|s| &s.token == token)
    }

    fn expect_token(&mut self, token: Token) -> SqlResult<()> {
        if self.match_token(&token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn unexpected(&self, expected: &str) -> SqlError {
        SqlError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current_token().to_string(),
            position: self.current_position(),
        }
    }
}

/// Anchored, case-insensitive regular expression for a LIKE pattern
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::from("(?i)^");
    for ch in pattern.chars() {
        match ch {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    regex
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(clause: &str) -> Rule {
        Parser::new(clause).unwrap().parse().unwrap()
    }

    fn parse_err(clause: &str) -> SqlError {
        match Parser::new(clause).and_then(|mut p| p.parse()) {
            Ok(rule) => panic!("expected error for {:?}, got {:?}", clause, rule),
            Err(e) => e,
        }
    }

    fn head_filter(rule: &Rule) -> &Filter {
        match rule.head() {
            Condition::Filter(f) => f,
            other => panic!("expected filter, got {:?}", other),
        }
    }

    fn record(price: i64, item: &str, discount: i64) -> Value {
        Value::from(json!({"price": price, "item": item, "discount": discount}))
    }

    #[test]
    fn test_parse_nested_group() {
        let rule = parse("price > 100 AND (item = 'laptop' OR discount > 50)");
        assert_eq!(rule.links().count(), 2);
        assert!(matches!(rule.next().map(Rule::head), Some(Condition::Rule(_))));

        assert!(rule.matches(&record(150, "laptop", 0)));
        assert!(!rule.matches(&record(50, "laptop", 0)));
        assert!(rule.matches(&record(150, "desk", 60)));
    }

    #[test]
    fn test_parse_chain_groups_by_position() {
        let rule = parse("price > 1000 AND item = 'desk' OR discount = 0");
        let links: Vec<BooleanOp> = rule.links().map(Rule::operator).collect();
        assert_eq!(links, vec![BooleanOp::And, BooleanOp::Or, BooleanOp::And]);
        // price > 1000 AND (item = desk OR discount = 0)
        assert!(!rule.matches(&record(150, "laptop", 0)));
    }

    #[test]
    fn test_parse_literals() {
        let rule = parse("price >= 10.5");
        assert_eq!(head_filter(&rule).value(), &Value::Float(10.5));

        let rule = parse("active = true");
        assert_eq!(head_filter(&rule).value(), &Value::Boolean(true));

        let rule = parse("delta > -5");
        assert_eq!(head_filter(&rule).value(), &Value::Int(-5));

        let rule = parse("price < {{ budget }}");
        assert_eq!(head_filter(&rule).value(), &Value::from("{{ budget }}"));
    }

    #[test]
    fn test_parse_between_and_in() {
        let rule = parse("price BETWEEN 100 AND 200 AND item IN ('laptop', 'desk')");
        let between = head_filter(&rule);
        assert_eq!(between.operator(), Operator::Between);
        assert_eq!(between.value(), &Value::from(vec![100, 200]));

        let rec = record(150, "desk", 0);
        assert!(rule.matches(&rec));
        assert!(!rule.matches(&record(150, "mouse", 0)));

        let rule = parse("price NOT BETWEEN 100 AND 200");
        assert!(head_filter(&rule).is_negated());
        assert!(!rule.matches(&rec));

        let rule = parse("item NOT IN ('laptop', 'mouse')");
        assert_eq!(head_filter(&rule).operator(), Operator::NotIn);
        assert!(rule.matches(&rec));
    }

    #[test]
    fn test_parse_like() {
        let cases = [
            ("name LIKE '%Jane%'", Operator::Contains),
            ("name LIKE '%Jane'", Operator::EndsWith),
            ("name LIKE 'Jane%'", Operator::StartsWith),
            ("name LIKE 'Jane'", Operator::Equal),
            ("name NOT LIKE '%Jane%'", Operator::NotContains),
            ("name NOT LIKE '%Jane'", Operator::NotEndsWith),
            ("name NOT LIKE 'Jane%'", Operator::NotStartsWith),
        ];
        for (clause, operator) in cases {
            let rule = parse(clause);
            let filter = head_filter(&rule);
            assert_eq!(filter.operator(), operator, "{}", clause);
            assert_eq!(filter.value(), &Value::from("Jane"), "{}", clause);
        }

        let person = Value::from(json!({"name": "Jane Doe"}));
        assert!(!parse("name LIKE '%Jane'").matches(&person));
        assert!(parse("name LIKE 'jane%'").matches(&person));
    }

    #[test]
    fn test_parse_like_inner_wildcards() {
        let rule = parse("code LIKE 'A_C%9'");
        let filter = head_filter(&rule);
        assert_eq!(filter.operator(), Operator::Pattern);
        assert_eq!(filter.value(), &Value::from("(?i)^A.C.*9$"));

        assert!(rule.matches(&Value::from(json!({"code": "abc-0009"}))));
        assert!(!rule.matches(&Value::from(json!({"code": "abd-0009"}))));
        assert!(parse("code NOT LIKE 'A_C%9'").matches(&Value::from(json!({"code": "x"}))));
    }

    #[test]
    fn test_parse_null_checks_take_no_value() {
        let rule = parse("deleted_at IS NULL AND owner IS NOT NULL");
        assert_eq!(head_filter(&rule).operator(), Operator::IsNull);

        let rec = Value::from(json!({"owner": "ops"}));
        assert!(rule.matches(&rec));
        assert!(!rule.matches(&Value::from(json!({"deleted_at": "2024-01-01", "owner": "ops"}))));
    }

    #[test]
    fn test_parse_not_prefix() {
        let rule = parse("NOT (price > 100 OR item = 'desk')");
        assert!(matches!(rule.head(), Condition::Rule(r) if r.is_negated()));
        assert!(rule.matches(&record(50, "laptop", 0)));
        assert!(!rule.matches(&record(50, "desk", 0)));

        let rule = parse("NOT NOT price > 100");
        assert!(rule.matches(&record(150, "laptop", 0)));
    }

    #[test]
    fn test_not_on_unresolvable_field() {
        let rec = Value::from(json!({"n": 5}));
        assert!(!parse("missing = 1").matches(&rec));
        assert!(parse("NOT missing = 1").matches(&rec));
        assert!(parse("NOT (missing = 1)").matches(&rec));
        assert!(parse("missing NOT BETWEEN 1 AND 2").matches(&rec));
        assert!(!parse("missing BETWEEN 1 AND 2").matches(&rec));
    }

    #[test]
    fn test_parse_deep_nesting_and_semicolon() {
        let rule = parse("((((price > 100))));");
        assert!(rule.matches(&record(150, "x", 0)));
        assert!(!rule.matches(&record(50, "x", 0)));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_err(""), SqlError::EmptyClause);
        assert!(matches!(
            parse_err("price >"),
            SqlError::UnexpectedToken { ref expected, .. } if expected == "value"
        ));
        assert!(matches!(
            parse_err("price 100"),
            SqlError::UnexpectedToken { ref expected, .. } if expected == "comparison operator"
        ));
        assert!(matches!(parse_err("= 100"), SqlError::UnexpectedToken { .. }));
        assert!(matches!(parse_err("price > 1 AND"), SqlError::UnexpectedToken { .. }));
        assert!(matches!(parse_err("AND price > 1"), SqlError::UnexpectedToken { .. }));
        assert!(matches!(parse_err("(price > 1"), SqlError::UnexpectedToken { .. }));
        assert!(matches!(parse_err("price > 1)"), SqlError::UnexpectedToken { .. }));
        assert!(matches!(parse_err("()"), SqlError::UnexpectedToken { .. }));
        assert!(matches!(parse_err("price BETWEEN 1 OR 2"), SqlError::UnexpectedToken { .. }));
        assert!(matches!(parse_err("item IN ()"), SqlError::UnexpectedToken { .. }));
        assert!(matches!(parse_err("item IN 'a'"), SqlError::UnexpectedToken { .. }));
        assert!(matches!(parse_err("name = 'open"), SqlError::UnterminatedString { .. }));
    }
}
