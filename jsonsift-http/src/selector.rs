//! Where the filter query comes from.

use std::borrow::Cow;
use std::fmt::Debug;

use http::HeaderName;
use http::request::Parts;
use percent_encoding::percent_decode_str;
use tracing::debug;

/// Default header carrying the query.
pub const DEFAULT_HEADER: &str = "X-JsonPath";

/// Default URL query parameter carrying the query.
pub const DEFAULT_QUERY_PARAM: &str = "jsonpath_filter";

/// Which part of the request supplied the query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuerySource {
    /// No query was supplied.
    #[default]
    None,
    /// A request header.
    Header,
    /// A URL query parameter.
    QueryParam,
}

/// The filter query of one request. Read once, never changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRequest {
    query: Option<String>,
    source: QuerySource,
}

impl FilterRequest {
    /// A request without a query.
    pub fn none() -> Self {
        Self::default()
    }

    /// A request whose query came from `source`. An empty query counts as
    /// none.
    pub fn new(query: impl Into<String>, source: QuerySource) -> Self {
        let query = query.into();
        if query.is_empty() {
            return Self::none();
        }
        Self {
            query: Some(query),
            source,
        }
    }

    /// The query, if any.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Where the query came from.
    pub fn source(&self) -> QuerySource {
        self.source
    }
}

/// Extracts the filter query from an inbound request.
///
/// One selector is chosen per deployment; the pipeline never branches on
/// the source itself.
pub trait QuerySelector: Send + Sync + Debug {
    /// Reads the query from the request head.
    fn extract_query(&self, parts: &Parts) -> FilterRequest;
}

/// Reads the query from a request header.
///
/// Only the first value is used. Non-UTF-8 bytes are replaced rather than
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSelector {
    name: HeaderName,
}

impl HeaderSelector {
    /// Reads the query from `name`.
    pub fn new(name: HeaderName) -> Self {
        Self { name }
    }

    /// Header name in use.
    pub fn name(&self) -> &HeaderName {
        &self.name
    }
}

impl Default for HeaderSelector {
    fn default() -> Self {
        Self::new(HeaderName::from_static("x-jsonpath"))
    }
}

impl QuerySelector for HeaderSelector {
    fn extract_query(&self, parts: &Parts) -> FilterRequest {
        match parts.headers.get(&self.name) {
            Some(value) => {
                let query = String::from_utf8_lossy(value.as_bytes());
                debug!(header = %self.name, query = %query, "filter query from header");
                FilterRequest::new(query.trim(), QuerySource::Header)
            }
            None => FilterRequest::none(),
        }
    }
}

/// Decodes one `application/x-www-form-urlencoded` component. Invalid
/// UTF-8 is replaced rather than rejected, as for headers.
fn form_decode(component: &str) -> Cow<'_, str> {
    if component.contains('+') {
        let spaced = component.replace('+', " ");
        Cow::Owned(percent_decode_str(&spaced).decode_utf8_lossy().into_owned())
    } else {
        percent_decode_str(component).decode_utf8_lossy()
    }
}

/// Reads the query from a URL query parameter.
///
/// The value is percent-decoded. Only the named parameter is looked at, so
/// unrelated parameters never affect the result. When the parameter is
/// repeated, or given in array form (`name[]=a&name[]=b`), the first value
/// wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParamSelector {
    name: String,
}

impl QueryParamSelector {
    /// Reads the query from parameter `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Parameter name in use.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for QueryParamSelector {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_PARAM)
    }
}

impl QuerySelector for QueryParamSelector {
    fn extract_query(&self, parts: &Parts) -> FilterRequest {
        let Some(raw) = parts.uri.query() else {
            return FilterRequest::none();
        };

        let value = raw
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .find(|(key, _)| {
                let key = form_decode(key);
                key == self.name.as_str()
                    || key
                        .strip_suffix("[]")
                        .is_some_and(|base| base == self.name)
            })
            .map(|(_, value)| form_decode(value));

        match value {
            Some(query) => {
                debug!(param = %self.name, query = %query, "filter query from query string");
                FilterRequest::new(query.trim(), QuerySource::QueryParam)
            }
            None => FilterRequest::none(),
        }
    }
}
