//! JSONPath evaluation.
//!
//! Supported syntax:
//!
//! | Query | Selects |
//! |-------|---------|
//! | `$` | the whole document |
//! | `$.a.b`, `$['a']["b"]` | a member |
//! | `$.a[0]`, `$.a[-1]` | an array element, negative counts from the end |
//! | `$.a[1:3]`, `$.a[::-1]` | a slice |
//! | `$.a.*`, `$.a[*]` | every child |
//! | `$..price`, `$..*` | descendants |
//! | `$.a[?@.price < 10 && @.isbn]` | children matching a filter |
//!
//! A *definite* query (members and single indexes only) resolves to the one
//! value it names, and naming something that is not there is a
//! [`QueryError::NoMatch`]. Any other query resolves to an array of every
//! selected value, which is empty when nothing matched.
//!
//! Filter expressions nest at most 64 levels deep; deeper queries are
//! [`QueryError::Invalid`].

pub mod ast;
mod parser;
mod predicate;
mod select;

use serde_json::Value;

use crate::query::{QueryError, QueryEvaluator};

pub use ast::Path;
pub use parser::parse;
pub use select::select;

/// JSONPath [`QueryEvaluator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonPath;

impl QueryEvaluator for JsonPath {
    fn evaluate(&self, document: &Value, query: &str) -> Result<Value, QueryError> {
        let path = parse(query)?;
        let mut selected = select(&path, document);

        if path.is_definite() {
            return selected
                .pop()
                .cloned()
                .ok_or_else(|| QueryError::no_match(query));
        }
        Ok(Value::Array(selected.into_iter().cloned().collect()))
    }
}
