//! Evaluation of structured WHERE conditions against generated rows

use std::cmp::Ordering;

use regex::Regex;
use serde_json::Value;

use crate::filter::{parse_where_condition, ParsedCondition};

/// A parsed condition ready to test rows
#[derive(Debug, Clone)]
pub struct Predicate {
    field: String,
    op: Op,
}

#[derive(Debug, Clone)]
enum Op {
    Compare(Ordering, bool, Literal),
    Like(Regex, bool),
    In(Vec<Literal>, bool),
    Null(bool),
    Between(Literal, Literal),
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Number(f64),
    Text(String),
}

impl Literal {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let unquoted = raw
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .or_else(|| raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')));
        match unquoted {
            Some(text) => Self::Text(text.to_string()),
            None => raw
                .parse::<f64>()
                .map(Self::Number)
                .unwrap_or_else(|_| Self::Text(raw.to_string())),
        }
    }

    /// Order a row value against this literal; `None` when incomparable
    fn compare(&self, value: &Value) -> Option<Ordering> {
        match (self, value) {
            (_, Value::Null) => None,
            (Self::Number(n), Value::Number(v)) => v.as_f64()?.partial_cmp(n),
            (Self::Number(n), Value::String(s)) => s.parse::<f64>().ok()?.partial_cmp(n),
            (Self::Text(t), Value::String(s)) => Some(s.as_str().cmp(t.as_str())),
            (Self::Text(t), other) => Some(other.to_string().as_str().cmp(t.as_str())),
            (Self::Number(_), _) => None,
        }
    }
}

fn like_regex(pattern: &str) -> Option<Regex> {
    let mut re = String::from("^");
    for c in pattern.chars() {
        match c {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}

fn split_list(raw: &str) -> Vec<Literal> {
    raw.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Literal::parse)
        .collect()
}

impl Predicate {
    /// Parse a condition; `None` for anything the recognizer rejects
    pub fn parse(text: &str) -> Option<Self> {
        let ParsedCondition {
            field,
            operator,
            value,
            is_valid,
        } = parse_where_condition(text);
        if !is_valid {
            return None;
        }

        let op = match operator.as_str() {
            "=" => Op::Compare(Ordering::Equal, false, Literal::parse(&value)),
            "!=" | "<>" => Op::Compare(Ordering::Equal, true, Literal::parse(&value)),
            ">" => Op::Compare(Ordering::Greater, false, Literal::parse(&value)),
            "<=" => Op::Compare(Ordering::Greater, true, Literal::parse(&value)),
            "<" => Op::Compare(Ordering::Less, false, Literal::parse(&value)),
            ">=" => Op::Compare(Ordering::Less, true, Literal::parse(&value)),
            "LIKE" | "NOT LIKE" => {
                let Literal::Text(pattern) = Literal::parse(&value) else {
                    return None;
                };
                Op::Like(like_regex(&pattern)?, operator == "NOT LIKE")
            }
            "IN" | "NOT IN" => Op::In(split_list(&value), operator == "NOT IN"),
            "IS NULL" => Op::Null(false),
            "IS NOT NULL" => Op::Null(true),
            "BETWEEN" => {
                let upper = value.to_ascii_uppercase();
                let split = upper.find(" AND ")?;
                Op::Between(
                    Literal::parse(&value[..split]),
                    Literal::parse(&value[split + 5..]),
                )
            }
            _ => return None,
        };

        Some(Self {
            field: field.to_ascii_lowercase(),
            op,
        })
    }

    /// Test one row (a JSON object keyed by column name)
    pub fn matches(&self, row: &Value) -> bool {
        let value = row.get(&self.field).unwrap_or(&Value::Null);
        match &self.op {
            Op::Compare(ordering, negate, literal) => match literal.compare(value) {
                Some(o) => (o == *ordering) != *negate,
                None => false,
            },
            Op::Like(re, negate) => match value {
                Value::String(s) => re.is_match(s) != *negate,
                Value::Null => false,
                other => re.is_match(&other.to_string()) != *negate,
            },
            Op::In(items, negate) => {
                if value.is_null() {
                    return false;
                }
                let found = items
                    .iter()
                    .any(|item| item.compare(value) == Some(Ordering::Equal));
                found != *negate
            }
            Op::Null(negate) => value.is_null() == !*negate,
            Op::Between(low, high) => matches!(
                (low.compare(value), high.compare(value)),
                (Some(Ordering::Greater | Ordering::Equal), Some(Ordering::Less | Ordering::Equal))
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn row() -> Value {
        json!({
            "log_level": "ERROR",
            "duration_ms": 1500,
            "sql_user": "analyst",
            "query_text": "SELECT * FROM sales",
            "exception_text": null
        })
    }

    #[rstest]
    #[case("log_level = 'ERROR'", true)]
    #[case("log_level != 'ERROR'", false)]
    #[case("duration_ms > 1000", true)]
    #[case("duration_ms <= 1000", false)]
    #[case("duration_ms >= 1500", true)]
    #[case("query_text LIKE '%sales%'", true)]
    #[case("query_text NOT LIKE 'SELECT%'", false)]
    #[case("sql_user IN ('root', 'analyst')", true)]
    #[case("sql_user NOT IN ('root')", true)]
    #[case("exception_text IS NULL", true)]
    #[case("missing_column IS NOT NULL", false)]
    #[case("duration_ms BETWEEN 100 AND 5000", true)]
    #[case("duration_ms BETWEEN 2000 AND 5000", false)]
    fn test_predicate_matches(#[case] condition: &str, #[case] expected: bool) {
        let predicate = Predicate::parse(condition).expect("parses");
        assert_eq!(predicate.matches(&row()), expected, "{condition}");
    }

    #[test]
    fn test_unparsable_condition() {
        assert!(Predicate::parse("just words").is_none());
    }
}
