//! Results of the transformation step.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FilterError;

/// What to send back for one response. Produced once, consumed once.
#[derive(Debug)]
pub enum FilterOutcome {
    /// Send the captured body untouched.
    Passthrough(Bytes),
    /// Send this value, JSON-encoded, instead of the captured body.
    Filtered(Value),
    /// Filtering failed.
    Error(FilterError),
}

impl FilterOutcome {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            FilterOutcome::Passthrough(_) => "passthrough",
            FilterOutcome::Filtered(_) => "filtered",
            FilterOutcome::Error(error) => error.kind().as_str(),
        }
    }

    /// `true` for [`FilterOutcome::Passthrough`].
    pub fn is_passthrough(&self) -> bool {
        matches!(self, FilterOutcome::Passthrough(_))
    }
}

impl From<Result<Value, FilterError>> for FilterOutcome {
    fn from(result: Result<Value, FilterError>) -> Self {
        match result {
            Ok(value) => FilterOutcome::Filtered(value),
            Err(error) => FilterOutcome::Error(error),
        }
    }
}

/// Structural type of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `{...}`
    Object,
    /// `[...]`
    Array,
    /// `"..."`
    String,
    /// `1`, `2.5`
    Number,
    /// `true`, `false`
    Bool,
    /// `null`
    Null,
}

impl Shape {
    /// Shape of `value`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Shape::Object,
            Value::Array(_) => Shape::Array,
            Value::String(_) => Shape::String,
            Value::Number(_) => Shape::Number,
            Value::Bool(_) => Shape::Bool,
            Value::Null => Shape::Null,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Shape::Object => "an object",
            Shape::Array => "an array",
            Shape::String => "a string",
            Shape::Number => "a number",
            Shape::Bool => "a boolean",
            Shape::Null => "null",
        })
    }
}

/// Which query results are acceptable as filtered output.
///
/// Only applies to the result of a query. A response filtered without a
/// query is the whole document and is always accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapePolicy {
    /// Objects, arrays and scalars are all accepted.
    #[default]
    Any,
    /// Only objects are accepted.
    Object,
}

impl ShapePolicy {
    /// `true` when `value` satisfies the policy.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ShapePolicy::Any => true,
            ShapePolicy::Object => value.is_object(),
        }
    }
}

impl fmt::Display for ShapePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShapePolicy::Any => "any value",
            ShapePolicy::Object => "an object",
        })
    }
}
