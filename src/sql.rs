// SQL module - WHERE-clause parsing into rule trees

pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use error::{SqlError, SqlResult};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Spanned, Token};

use regex::Regex;
use std::sync::LazyLock;

use crate::condition::Rule;

static WHERE_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bWHERE\b").expect("WHERE pattern is valid"));

/// Text of the condition clause in `sql`
///
/// Everything after the first `WHERE`, or the whole string when there is
/// none. A trailing `WHERE` with nothing after it yields the text before it.
pub fn where_clause(sql: &str) -> &str {
    let Some(found) = WHERE_KEYWORD.find(sql) else {
        return sql.trim();
    };
    let after = sql[found.end()..].trim();
    if after.is_empty() {
        sql[..found.start()].trim()
    } else {
        after
    }
}

/// Parse a WHERE clause, or a statement containing one, into a rule
pub fn parse(sql: &str) -> SqlResult<Rule> {
    let clause = where_clause(sql);
    let rule = Parser::new(clause)?.parse()?;
    log::debug!("parsed {:?} into a {}-link rule", clause, rule.links().count());
    Ok(rule.with_source(clause))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Value;
    use serde_json::json;

    #[test]
    fn test_where_clause() {
        assert_eq!(
            where_clause("SELECT * FROM items WHERE price > 100"),
            "price > 100"
        );
        assert_eq!(where_clause("select * from t where a = 1"), "a = 1");
        assert_eq!(where_clause("  price > 100  "), "price > 100");
        assert_eq!(where_clause("price > 100 WHERE"), "price > 100");
        // `nowhere` is not the keyword
        assert_eq!(where_clause("nowhere = 1"), "nowhere = 1");
    }

    #[test]
    fn test_where_inside_a_literal_splits_the_clause() {
        let clause = "note = 'somewhere where x'";
        assert_eq!(where_clause(clause), "x'");
        assert!(matches!(
            parse(clause),
            Err(SqlError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn test_parse_statement() {
        let statement =
            "SELECT * FROM orders WHERE price > 100 AND (item = 'laptop' OR discount > 50)";
        let rule = parse(statement).unwrap();
        assert_eq!(
            rule.source(),
            Some("price > 100 AND (item = 'laptop' OR discount > 50)")
        );

        let laptop = Value::from(json!({"price": 150, "item": "laptop", "discount": 0}));
        let cheap = Value::from(json!({"price": 50, "item": "laptop", "discount": 0}));
        assert!(rule.matches(&laptop));
        assert!(!rule.matches(&cheap));
    }

    #[test]
    fn test_parse_from_str() {
        let rule: Rule = "created >= '2023-01-01'".parse().unwrap();
        assert!(rule.matches(&Value::from(json!({"created": "2023-06-01T00:00:00Z"}))));
        assert!(!rule.matches(&Value::from(json!({"created": "2022-12-31"}))));

        let err = "SELECT id FROM t WHERE".parse::<Rule>().unwrap_err();
        assert!(matches!(err, SqlError::UnexpectedToken { .. }));
    }
}
