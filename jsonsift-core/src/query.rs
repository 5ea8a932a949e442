//! The query evaluation seam.
//!
//! A [`QueryEvaluator`] resolves a query string against a parsed JSON
//! document. The rest of the pipeline treats it as a black box: it only
//! cares whether a value came back or why not.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// Reasons a query produced no value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The query string could not be parsed or compiled.
    #[error("invalid query `{query}`: {reason}")]
    Invalid {
        /// The offending query.
        query: String,
        /// What the parser or compiler rejected.
        reason: String,
    },

    /// The query is well-formed but selected nothing in the document.
    #[error("query `{query}` matched nothing")]
    NoMatch {
        /// The query that matched nothing.
        query: String,
    },

    /// The query failed while running against the document.
    #[error("query `{query}` failed: {reason}")]
    Runtime {
        /// The query that failed.
        query: String,
        /// Evaluator-specific failure description.
        reason: String,
    },
}

impl QueryError {
    pub(crate) fn invalid(query: &str, reason: impl Into<String>) -> Self {
        QueryError::Invalid {
            query: query.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn no_match(query: &str) -> Self {
        QueryError::NoMatch {
            query: query.to_owned(),
        }
    }
}

/// Resolves a query string against a JSON document.
///
/// Implementations must be pure: the same document and query always give
/// the same answer, and no state is kept between calls.
///
/// # Examples
///
/// ```
/// use jsonsift_core::{JsonPath, QueryEvaluator};
/// use serde_json::json;
///
/// let document = json!({"store": {"bicycle": {"color": "red"}}});
/// let value = JsonPath.evaluate(&document, "$.store.bicycle.color").unwrap();
/// assert_eq!(value, json!("red"));
/// ```
pub trait QueryEvaluator: Send + Sync {
    /// Evaluates `query` against `document`.
    fn evaluate(&self, document: &Value, query: &str) -> Result<Value, QueryError>;
}

impl<T> QueryEvaluator for &T
where
    T: QueryEvaluator + ?Sized,
{
    fn evaluate(&self, document: &Value, query: &str) -> Result<Value, QueryError> {
        (**self).evaluate(document, query)
    }
}

impl<T> QueryEvaluator for Box<T>
where
    T: QueryEvaluator + ?Sized,
{
    fn evaluate(&self, document: &Value, query: &str) -> Result<Value, QueryError> {
        self.as_ref().evaluate(document, query)
    }
}

impl<T> QueryEvaluator for Arc<T>
where
    T: QueryEvaluator + ?Sized,
{
    fn evaluate(&self, document: &Value, query: &str) -> Result<Value, QueryError> {
        self.as_ref().evaluate(document, query)
    }
}
