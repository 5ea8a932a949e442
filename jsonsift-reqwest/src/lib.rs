//! jsonsift response filtering for reqwest clients.
//!
//! ```no_run
//! use jsonsift_http::{QueryParamSelector, ResponseFilter};
//! use jsonsift_reqwest::SiftMiddleware;
//! use reqwest_middleware::ClientBuilder;
//!
//! # async fn run() -> Result<(), reqwest_middleware::Error> {
//! let filter = ResponseFilter::builder()
//!     .selector(QueryParamSelector::default())
//!     .build();
//! let client = ClientBuilder::new(reqwest::Client::new())
//!     .with(SiftMiddleware::new(filter))
//!     .build();
//!
//! let response = client
//!     .get("http://localhost:3000/users?jsonpath_filter=$.users[0]")
//!     .send()
//!     .await?;
//! # drop(response);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod middleware;

pub use middleware::SiftMiddleware;

pub use jsonsift_http::{ErrorPolicy, ResponseFilter};
