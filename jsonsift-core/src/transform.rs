//! Decode, evaluate, check shape.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::FilterError;
use crate::outcome::{FilterOutcome, Shape, ShapePolicy};
use crate::query::QueryEvaluator;

/// Turns a JSON body plus an optional query into a [`FilterOutcome`].
///
/// Never returns [`FilterOutcome::Passthrough`]: whether a body should be
/// decoded at all is decided by the caller.
#[derive(Clone)]
pub struct Transformer {
    evaluator: Arc<dyn QueryEvaluator>,
    shape: ShapePolicy,
}

impl Transformer {
    /// Creates a transformer using `evaluator` and applying `shape` to query
    /// results.
    pub fn new<E>(evaluator: E, shape: ShapePolicy) -> Self
    where
        E: QueryEvaluator + 'static,
    {
        Self {
            evaluator: Arc::new(evaluator),
            shape,
        }
    }

    /// Shape policy applied to query results.
    pub fn shape(&self) -> ShapePolicy {
        self.shape
    }

    /// Decodes `body` and applies `query` to it.
    ///
    /// Without a query the whole decoded document is the result. An empty
    /// query string counts as no query.
    pub fn transform(&self, body: &[u8], query: Option<&str>) -> FilterOutcome {
        self.try_transform(body, query).into()
    }

    fn try_transform(&self, body: &[u8], query: Option<&str>) -> Result<Value, FilterError> {
        let document: Value = serde_json::from_slice(body).inspect_err(|error| {
            warn!(%error, len = body.len(), "response body is not valid JSON");
        })?;

        let Some(query) = query.filter(|query| !query.is_empty()) else {
            debug!("no query, returning whole document");
            return Ok(document);
        };

        let value = self.evaluator.evaluate(&document, query).inspect_err(|error| {
            warn!(query = %query, %error, "query failed");
        })?;

        if !self.shape.accepts(&value) {
            let found = Shape::of(&value);
            warn!(query = %query, ?found, expected = ?self.shape, "query result rejected");
            return Err(FilterError::ShapeMismatch {
                expected: self.shape,
                found,
            });
        }

        debug!(query = %query, shape = ?Shape::of(&value), "query applied");
        Ok(value)
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}
