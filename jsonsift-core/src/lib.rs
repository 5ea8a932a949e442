#![warn(missing_docs)]
//! # jsonsift-core
//!
//! Protocol-agnostic building blocks of the jsonsift response filter.
//!
//! This crate knows nothing about HTTP. It owns the parts of the pipeline
//! that operate on a fully buffered body:
//!
//! - **Evaluate** a query against a parsed document ([`QueryEvaluator`]),
//!   with a JSONPath engine ([`JsonPath`]) and a jq engine ([`Jq`]);
//! - **Transform** a body: decode, run the query, check the result shape
//!   ([`Transformer`]);
//! - **Report** what happened ([`FilterOutcome`], [`FilterError`]).
//!
//! Protocol crates (`jsonsift-http`) decide *whether* a body is handed to the
//! [`Transformer`] and how the outcome is written back.
//!
//! ```
//! use jsonsift_core::{FilterOutcome, JsonPath, ShapePolicy, Transformer};
//! use serde_json::json;
//!
//! let transformer = Transformer::new(JsonPath, ShapePolicy::Any);
//! let outcome = transformer.transform(br#"{"a":1,"b":{"c":2}}"#, Some("$.b"));
//! match outcome {
//!     FilterOutcome::Filtered(value) => assert_eq!(value, json!({"c": 2})),
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! ```

pub mod error;
pub mod jq;
pub mod jsonpath;
pub mod outcome;
pub mod query;
pub mod transform;

pub use error::{ErrorKind, FilterError};
pub use jq::Jq;
pub use jsonpath::JsonPath;
pub use outcome::{FilterOutcome, Shape, ShapePolicy};
pub use query::{QueryError, QueryEvaluator};
pub use transform::Transformer;
