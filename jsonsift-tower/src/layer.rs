use std::sync::Arc;

use http::HeaderName;
use jsonsift_core::{QueryEvaluator, ShapePolicy};
use jsonsift_http::{
    ErrorPolicy, HeaderSelector, QueryParamSelector, QuerySelector, ResponseFilter,
    ResponseFilterBuilder,
};
use tower::Layer;

use crate::service::SiftService;

/// Tower layer that filters JSON responses of the wrapped service.
#[derive(Debug, Clone)]
pub struct Sift {
    filter: Arc<ResponseFilter>,
}

impl Sift {
    /// Wraps an already configured filter.
    pub fn new(filter: ResponseFilter) -> Self {
        Self {
            filter: Arc::new(filter),
        }
    }

    /// Starts building a layer with the default filter: JSONPath from the
    /// `X-JsonPath` header, any result shape, errors answered with 4xx/502.
    pub fn builder() -> SiftBuilder {
        SiftBuilder::default()
    }

    /// The filter shared by every service this layer creates.
    pub fn filter(&self) -> &ResponseFilter {
        &self.filter
    }
}

impl Default for Sift {
    fn default() -> Self {
        Self::new(ResponseFilter::default())
    }
}

impl From<ResponseFilter> for Sift {
    fn from(filter: ResponseFilter) -> Self {
        Self::new(filter)
    }
}

impl<S> Layer<S> for Sift {
    type Service = SiftService<S>;

    fn layer(&self, upstream: S) -> Self::Service {
        SiftService::new(upstream, Arc::clone(&self.filter))
    }
}

/// Fluent builder for [`Sift`].
#[derive(Default)]
pub struct SiftBuilder {
    inner: ResponseFilterBuilder,
}

impl SiftBuilder {
    /// Reads the query from header `name`.
    pub fn header(self, name: HeaderName) -> Self {
        self.selector(HeaderSelector::new(name))
    }

    /// Reads the query from URL query parameter `name`.
    pub fn query_param(self, name: impl Into<String>) -> Self {
        self.selector(QueryParamSelector::new(name))
    }

    /// Uses a custom query selector.
    pub fn selector<Q>(self, selector: Q) -> Self
    where
        Q: QuerySelector + 'static,
    {
        SiftBuilder {
            inner: self.inner.selector(selector),
        }
    }

    /// Query language and accepted result shape.
    pub fn evaluator<E>(self, evaluator: E, shape: ShapePolicy) -> Self
    where
        E: QueryEvaluator + 'static,
    {
        SiftBuilder {
            inner: self.inner.evaluator(evaluator, shape),
        }
    }

    /// What to do with decode, query and shape failures.
    pub fn error_policy(self, policy: ErrorPolicy) -> Self {
        SiftBuilder {
            inner: self.inner.error_policy(policy),
        }
    }

    /// Largest origin body accepted, in bytes.
    pub fn body_limit(self, limit: usize) -> Self {
        SiftBuilder {
            inner: self.inner.body_limit(limit),
        }
    }

    /// Builds the layer.
    pub fn build(self) -> Sift {
        Sift::new(self.inner.build())
    }
}
