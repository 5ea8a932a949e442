//! The filter configuration schema.

use bytesize::ByteSize;
use http::HeaderName;
use jsonsift_core::{Jq, JsonPath, ShapePolicy};
use jsonsift_http::{
    DEFAULT_HEADER, ErrorPolicy, HeaderSelector, QueryParamSelector, ResponseFilter,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Where the filter query is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    /// Request header name.
    Header(String),
    /// URL query parameter name.
    Query(String),
}

impl Default for Selector {
    fn default() -> Self {
        Selector::Header(DEFAULT_HEADER.to_owned())
    }
}

/// Query language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    /// JSONPath, see [`jsonsift_core::JsonPath`].
    #[default]
    JsonPath,
    /// jq programs, see [`jsonsift_core::Jq`].
    ///
    /// Programs are screened for unbounded constructs, but a jq program can
    /// still be made expensive. Enable it only for trusted callers.
    Jq,
}

/// Filter configuration as written in YAML.
///
/// ```yaml
/// selector:
///   Header: X-JsonPath
/// language: JsonPath
/// shape: Any
/// on_error: Respond
/// max_body_size: 10MB
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFilter {
    /// Where the query is read from.
    #[serde(default)]
    pub selector: Selector,
    /// How the query is evaluated.
    #[serde(default)]
    pub language: Language,
    /// Which query results are accepted.
    #[serde(default)]
    pub shape: ShapePolicy,
    /// What to do when filtering fails.
    #[serde(default)]
    pub on_error: ErrorPolicy,
    /// Largest upstream body buffered. Unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_body_size: Option<ByteSize>,
}

impl ConfigFilter {
    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_saphyr::from_str(yaml)?)
    }

    /// Validates the configuration and builds the filter.
    pub fn into_filter(self) -> Result<ResponseFilter, ConfigError> {
        let mut builder = ResponseFilter::builder().error_policy(self.on_error);

        builder = match self.selector {
            Selector::Header(name) => {
                let header = HeaderName::try_from(name.as_str())
                    .map_err(|source| ConfigError::InvalidHeaderName { name, source })?;
                builder.selector(HeaderSelector::new(header))
            }
            Selector::Query(name) if name.trim().is_empty() => {
                return Err(ConfigError::EmptyParameterName);
            }
            Selector::Query(name) => builder.selector(QueryParamSelector::new(name)),
        };

        builder = match self.language {
            Language::JsonPath => builder.evaluator(JsonPath, self.shape),
            Language::Jq => builder.evaluator(Jq, self.shape),
        };

        if let Some(size) = self.max_body_size {
            let limit =
                usize::try_from(size.as_u64()).map_err(|_| ConfigError::BodySizeTooLarge(size))?;
            builder = builder.body_limit(limit);
        }

        Ok(builder.build())
    }
}
