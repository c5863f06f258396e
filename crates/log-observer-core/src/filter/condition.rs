//! WHERE-condition recognizer and suggestion generator
//!
//! The recognizer only splits a condition into field, operator and value so
//! the dropdown can offer completions. It never executes or sanitizes SQL.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use thiserror::Error;

use super::catalog::{field_suggestions, find_field, value_suggestions, FieldDescriptor};
use crate::models::StreamKind;

/// Field suggestions shown for an empty input
const BLANK_INPUT_FIELDS: usize = 10;
/// Field suggestions shown for a partial input
const MATCHING_FIELDS: usize = 8;

/// Field, operator and value of a recognized condition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedCondition {
    pub field: String,
    pub operator: String,
    pub value: String,
    pub is_valid: bool,
}

/// Why a condition was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("Invalid WHERE condition syntax")]
    InvalidSyntax,

    #[error("Field '{field}' does not exist in {table} table")]
    UnknownField { field: String, table: StreamKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Field,
    Value,
}

/// One dropdown entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub text: String,
    pub description: String,
    pub example: String,
}

impl Suggestion {
    fn for_field(field: &FieldDescriptor) -> Self {
        Self {
            kind: SuggestionKind::Field,
            text: field.name.to_string(),
            description: field.description.to_string(),
            example: format!("{} = 'value'", field.name),
        }
    }
}

/// How to turn the captures of one grammar into a condition
enum Shape {
    /// field, operator, value
    Binary,
    /// field, operator
    Unary,
    /// field, low, high
    Range,
}

static GRAMMARS: Lazy<Vec<(Regex, Shape)>> = Lazy::new(|| {
    [
        (r"(?i)^(\w+)\s*(=|!=|<>|>=|<=|>|<)\s*(.+)$", Shape::Binary),
        (r"(?i)^(\w+)\s+(LIKE|NOT\s+LIKE)\s+(.+)$", Shape::Binary),
        (r"(?i)^(\w+)\s+(IN|NOT\s+IN)\s*\((.+)\)$", Shape::Binary),
        (r"(?i)^(\w+)\s+(IS\s+NULL|IS\s+NOT\s+NULL)$", Shape::Unary),
        (r"(?i)^(\w+)\s+BETWEEN\s+(.+)\s+AND\s+(.+)$", Shape::Range),
    ]
    .into_iter()
    .map(|(pattern, shape)| (Regex::new(pattern).expect("static regex"), shape))
    .collect()
});

/// Upper-case an operator and collapse inner whitespace (`not   like` -> `NOT LIKE`)
fn normalize_operator(op: &str) -> String {
    op.split_whitespace()
        .map(str::to_ascii_uppercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn build(caps: &Captures<'_>, shape: &Shape) -> ParsedCondition {
    let field = caps[1].to_string();
    let (operator, value) = match shape {
        Shape::Binary => (normalize_operator(&caps[2]), caps[3].trim().to_string()),
        Shape::Unary => (normalize_operator(&caps[2]), String::new()),
        Shape::Range => (
            "BETWEEN".to_string(),
            format!("{} AND {}", caps[2].trim(), caps[3].trim()),
        ),
    };
    ParsedCondition {
        field,
        operator,
        value,
        is_valid: true,
    }
}

/// Match `text` against the condition grammars in order; the first match wins.
///
/// Returns an invalid, empty condition when nothing matches.
pub fn parse_where_condition(text: &str) -> ParsedCondition {
    let trimmed = text.trim();
    GRAMMARS
        .iter()
        .find_map(|(regex, shape)| regex.captures(trimmed).map(|caps| build(&caps, shape)))
        .unwrap_or_default()
}

/// Parse a condition and check that its field exists in the stream's table.
///
/// Operator and value are not checked against the field type.
pub fn validate_where_condition(
    text: &str,
    kind: StreamKind,
) -> Result<ParsedCondition, ConditionError> {
    let parsed = parse_where_condition(text);
    if !parsed.is_valid {
        return Err(ConditionError::InvalidSyntax);
    }
    if find_field(kind, &parsed.field).is_none() {
        return Err(ConditionError::UnknownField {
            field: parsed.field,
            table: kind,
        });
    }
    Ok(parsed)
}

/// Dropdown entries for the current input.
///
/// A blank input lists the first fields of the table. A complete condition
/// offers its field's known values as full conditions. Anything else lists
/// fields whose name or description contains the input.
pub fn generate_suggestions(text: &str, kind: StreamKind) -> Vec<Suggestion> {
    let fields = field_suggestions(kind);

    if text.trim().is_empty() {
        return fields
            .iter()
            .take(BLANK_INPUT_FIELDS)
            .map(Suggestion::for_field)
            .collect();
    }

    let parsed = parse_where_condition(text);
    if parsed.is_valid {
        return value_suggestions(&parsed.field)
            .iter()
            .map(|value| {
                let condition = format!("{} {} '{}'", parsed.field, parsed.operator, value);
                Suggestion {
                    kind: SuggestionKind::Value,
                    text: condition.clone(),
                    description: format!("{} equals {}", parsed.field, value),
                    example: condition,
                }
            })
            .collect();
    }

    let needle = text.to_lowercase();
    fields
        .iter()
        .filter(|f| {
            f.name.to_lowercase().contains(&needle) || f.description.to_lowercase().contains(&needle)
        })
        .take(MATCHING_FIELDS)
        .map(Suggestion::for_field)
        .collect()
}
