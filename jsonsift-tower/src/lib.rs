//! Tower middleware for the jsonsift response filter.
//!
//! [`Sift`] is a Tower [`Layer`](tower::Layer). The wrapped service runs
//! unchanged; its response is buffered, and when the client asked for it
//! with a query (by default in the `X-JsonPath` header) and the response is
//! JSON, the body is replaced by the part of the document the query
//! selects. Anything else is returned byte for byte.
//!
//! ```
//! use jsonsift_tower::Sift;
//! use jsonsift_http::ErrorPolicy;
//! use tower::{ServiceBuilder, service_fn};
//!
//! let service = ServiceBuilder::new()
//!     .layer(Sift::builder().error_policy(ErrorPolicy::Respond).build())
//!     .service(service_fn(|_req: http::Request<()>| async {
//!         let response = http::Response::builder()
//!             .header("content-type", "application/json")
//!             .body(http_body_util::Full::new(bytes::Bytes::from_static(br#"{"a":1}"#)))
//!             .unwrap();
//!         Ok::<_, std::convert::Infallible>(response)
//!     }));
//! # drop(service);
//! ```
//!
//! # Main Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Sift`] | Tower `Layer`, the entry point |
//! | [`SiftBuilder`] | Fluent builder for the layer |
//! | [`SiftService`] | The `Service` doing capture, decision and replay |

#![warn(missing_docs)]

/// Tower layer and builder.
pub mod layer;
/// The Tower service.
pub mod service;

pub use layer::{Sift, SiftBuilder};
pub use service::{SiftFuture, SiftService};
