//! Error types for the filtering pipeline.

use std::fmt;

use thiserror::Error;

use crate::outcome::{Shape, ShapePolicy};
use crate::query::QueryError;

/// Why a response could not be filtered or written.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The body claims to be JSON but does not decode.
    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// The query was malformed, failed, or matched nothing.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The query matched a value the configured [`ShapePolicy`] rejects.
    #[error("query result is {found}, expected {expected}")]
    ShapeMismatch {
        /// The policy that rejected the value.
        expected: ShapePolicy,
        /// What the query actually produced.
        found: Shape,
    },

    /// The filtered value could not be serialized.
    #[error("failed to encode filtered body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The downstream sink rejected the final write.
    #[error("failed to write response: {0}")]
    Write(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl FilterError {
    /// Wraps a downstream write failure.
    pub fn write<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        FilterError::Write(error.into())
    }

    /// Coarse classification used for logging and error bodies.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FilterError::Decode(_) => ErrorKind::DecodeFailure,
            FilterError::Query(_) => ErrorKind::QueryFailure,
            FilterError::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            FilterError::Encode(_) | FilterError::Write(_) => ErrorKind::WriteFailure,
        }
    }

    /// `true` for failures caused by the request or the origin body, which
    /// may be turned into an error response instead of failing the request.
    pub fn is_request_local(&self) -> bool {
        self.kind().is_request_local()
    }
}

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Body is not valid JSON despite its content type.
    DecodeFailure,
    /// Query malformed or matched nothing.
    QueryFailure,
    /// Query result rejected by the shape policy.
    ShapeMismatch,
    /// The final write could not be produced or was rejected.
    WriteFailure,
}

impl ErrorKind {
    /// Stable snake_case name, used in error bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::DecodeFailure => "decode_failure",
            ErrorKind::QueryFailure => "query_failure",
            ErrorKind::ShapeMismatch => "shape_mismatch",
            ErrorKind::WriteFailure => "write_failure",
        }
    }

    /// Everything except [`ErrorKind::WriteFailure`] is local to one request.
    pub fn is_request_local(self) -> bool {
        !matches!(self, ErrorKind::WriteFailure)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
