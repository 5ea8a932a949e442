#![warn(missing_docs)]
//! # jsonsift-http
//!
//! HTTP side of the jsonsift response filter.
//!
//! A response passes through three steps, strictly in order:
//!
//! 1. **Capture**: the origin writes into a [`CaptureSink`] (or its
//!    [`http::Response`] is drained with [`capture_response`]) and nothing
//!    reaches the client yet.
//! 2. **Decide**: the [`Decider`] looks at the captured `Content-Type` and
//!    the query found by the [`QuerySelector`] and produces a
//!    [`FilterOutcome`](jsonsift_core::FilterOutcome).
//! 3. **Replay**: [`replay`] performs the one real write, with headers
//!    finalized before the body.
//!
//! [`ResponseFilter`] bundles the three steps. Framework integrations
//! (`jsonsift-tower`, `jsonsift-reqwest`) are thin wrappers around it.
//!
//! ```
//! use jsonsift_http::{CapturedResponse, FilterRequest, QuerySource, ResponseFilter};
//! use bytes::Bytes;
//! use http::{HeaderMap, Method, StatusCode, header::CONTENT_TYPE};
//!
//! let filter = ResponseFilter::default();
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
//! let captured = CapturedResponse::new(
//!     StatusCode::OK,
//!     headers,
//!     Bytes::from_static(br#"{"a":1,"b":{"c":2}}"#),
//! );
//!
//! let request = FilterRequest::new("$.b", QuerySource::Header);
//! let outcome = filter.decide(&Method::GET, &captured, &request);
//! let response = filter.respond(captured, outcome).unwrap();
//! assert_eq!(response.body().as_ref(), br#"{"c":2}"#);
//! ```

pub mod capture;
pub mod decider;
pub mod filter;
pub mod replay;
pub mod selector;
pub mod sink;

pub use capture::{BoxError, CaptureError, capture_response};
pub use decider::Decider;
pub use filter::{HandleError, Origin, ResponseFilter, ResponseFilterBuilder};
pub use replay::{ErrorPolicy, replay};
pub use selector::{
    DEFAULT_HEADER, DEFAULT_QUERY_PARAM, FilterRequest, HeaderSelector, QueryParamSelector,
    QuerySelector, QuerySource,
};
pub use sink::{CaptureSink, CapturedResponse, ResponseSink, ResponseWriter, SinkError, WriteState};
