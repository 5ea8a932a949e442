//! YAML configuration for the jsonsift response filter.
//!
//! ```
//! use jsonsift_configuration::ConfigFilter;
//!
//! let filter = ConfigFilter::from_yaml("selector:\n  Query: jsonpath_filter\non_error: Abort\n")
//!     .and_then(ConfigFilter::into_filter)
//!     .unwrap();
//! assert_eq!(filter.error_policy(), jsonsift_http::ErrorPolicy::Abort);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod filter;

pub use error::ConfigError;
pub use filter::{ConfigFilter, Language, Selector};
