//! Configuration errors.

use thiserror::Error;

/// Why a configuration could not be turned into a filter.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid YAML or does not match the schema.
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    /// The configured header name is not a valid HTTP header name.
    #[error("invalid header name `{name}`")]
    InvalidHeaderName {
        /// The rejected name.
        name: String,
        /// Why `http` rejected it.
        #[source]
        source: http::header::InvalidHeaderName,
    },

    /// The query parameter selector names an empty parameter.
    #[error("query parameter name must not be empty")]
    EmptyParameterName,

    /// `max_body_size` exceeds the address space.
    #[error("max_body_size {0} does not fit in memory on this platform")]
    BodySizeTooLarge(bytesize::ByteSize),
}
