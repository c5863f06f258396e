//! Structured WHERE-condition filters
//!
//! - `catalog`: per-table field schema, operators and known values
//! - `condition`: condition recognizer, validation and dropdown suggestions
//! - `smart`: the stateful chip list and dropdown the viewer embeds

pub mod catalog;
pub mod condition;
pub mod smart;

pub use catalog::{
    field_suggestions, field_suggestions_for, operator_suggestions, value_suggestions,
    FieldDescriptor, Operator,
};
pub use condition::{
    generate_suggestions, parse_where_condition, validate_where_condition, ConditionError,
    ParsedCondition, Suggestion, SuggestionKind,
};
pub use smart::{FilterCondition, FilterListener, SmartFilter, EXAMPLE_FILTERS, INVALID_FILTER};
