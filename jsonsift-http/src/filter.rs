//! The capture → decide → replay pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::request::Parts;
use http::{Method, Request, Response};
use jsonsift_core::{FilterError, FilterOutcome, JsonPath, QueryEvaluator, ShapePolicy, Transformer};
use thiserror::Error;
use tracing::debug;

use crate::decider::Decider;
use crate::replay::{ErrorPolicy, replay};
use crate::selector::{FilterRequest, HeaderSelector, QuerySelector};
use crate::sink::{CaptureSink, CapturedResponse, ResponseSink, ResponseWriter};

/// An origin handler that writes its response into a [`ResponseSink`].
///
/// The handler does not know whether the sink is the client connection or
/// a capture.
#[async_trait]
pub trait Origin<ReqBody>: Send + Sync
where
    ReqBody: Send + 'static,
{
    /// Error returned when the handler fails.
    type Error: Send;

    /// Handles `request`, writing the response to `sink`.
    async fn serve(
        &self,
        request: Request<ReqBody>,
        sink: &mut (dyn ResponseSink + Send),
    ) -> Result<(), Self::Error>;
}

/// Why [`ResponseFilter::handle`] failed.
#[derive(Debug, Error)]
pub enum HandleError<E> {
    /// The origin handler failed. Nothing was written.
    #[error("origin handler failed")]
    Origin(#[source] E),

    /// Filtering or the final write failed.
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// A configured response filter.
///
/// Immutable and cheap to clone; one instance serves every request.
#[derive(Debug, Clone)]
pub struct ResponseFilter {
    selector: Arc<dyn QuerySelector>,
    decider: Decider,
    error_policy: ErrorPolicy,
    body_limit: Option<usize>,
}

impl ResponseFilter {
    /// Starts building a filter.
    pub fn builder() -> ResponseFilterBuilder {
        ResponseFilterBuilder::default()
    }

    /// Configured error policy.
    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    /// Configured body size limit.
    pub fn body_limit(&self) -> Option<usize> {
        self.body_limit
    }

    /// Reads the filter query from a request head.
    pub fn extract_query(&self, parts: &Parts) -> FilterRequest {
        self.selector.extract_query(parts)
    }

    /// Decides what to send for `captured`, the response to a `method`
    /// request.
    pub fn decide(
        &self,
        method: &Method,
        captured: &CapturedResponse,
        request: &FilterRequest,
    ) -> FilterOutcome {
        if method == Method::HEAD {
            debug!("HEAD request, passing response through");
            return FilterOutcome::Passthrough(captured.body().clone());
        }
        self.decider.decide(captured, request)
    }

    /// Writes `outcome` to `sink` under the configured error policy.
    pub fn replay<S>(
        &self,
        captured: &CapturedResponse,
        outcome: FilterOutcome,
        sink: &mut S,
    ) -> Result<(), FilterError>
    where
        S: ResponseSink + ?Sized,
    {
        replay(captured, outcome, self.error_policy, sink)
    }

    /// Replays `outcome` into a new [`http::Response`], keeping the
    /// captured version and extensions.
    pub fn respond(
        &self,
        mut captured: CapturedResponse,
        outcome: FilterOutcome,
    ) -> Result<Response<Bytes>, FilterError> {
        let mut writer = ResponseWriter::new();
        self.replay(&captured, outcome, &mut writer)?;

        let mut response = writer.finish();
        *response.version_mut() = captured.version();
        *response.extensions_mut() = captured.take_extensions();
        Ok(response)
    }

    /// Runs `origin` against a capture, then writes the filtered response to
    /// `sink`.
    ///
    /// If the origin fails nothing reaches `sink`.
    pub async fn handle<O, ReqBody, S>(
        &self,
        request: Request<ReqBody>,
        origin: &O,
        sink: &mut S,
    ) -> Result<(), HandleError<O::Error>>
    where
        O: Origin<ReqBody> + ?Sized,
        ReqBody: Send + 'static,
        S: ResponseSink + ?Sized,
    {
        let (parts, body) = request.into_parts();
        let filter_request = self.extract_query(&parts);
        let method = parts.method.clone();

        let mut capture = self
            .body_limit
            .map_or_else(CaptureSink::new, CaptureSink::with_limit);
        origin
            .serve(Request::from_parts(parts, body), &mut capture)
            .await
            .map_err(HandleError::Origin)?;

        let captured = capture.into_captured();
        let outcome = self.decide(&method, &captured, &filter_request);
        self.replay(&captured, outcome, sink)?;
        Ok(())
    }
}

impl Default for ResponseFilter {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ResponseFilter`].
pub struct ResponseFilterBuilder {
    selector: Arc<dyn QuerySelector>,
    transformer: Transformer,
    error_policy: ErrorPolicy,
    body_limit: Option<usize>,
}

impl ResponseFilterBuilder {
    /// Where the query is read from. Defaults to the `X-JsonPath` header.
    pub fn selector<Q>(self, selector: Q) -> Self
    where
        Q: QuerySelector + 'static,
    {
        ResponseFilterBuilder {
            selector: Arc::new(selector),
            ..self
        }
    }

    /// Query language and result shape policy. Defaults to JSONPath
    /// accepting any shape.
    pub fn evaluator<E>(self, evaluator: E, shape: ShapePolicy) -> Self
    where
        E: QueryEvaluator + 'static,
    {
        ResponseFilterBuilder {
            transformer: Transformer::new(evaluator, shape),
            ..self
        }
    }

    /// Uses a prepared transformer.
    pub fn transformer(self, transformer: Transformer) -> Self {
        ResponseFilterBuilder {
            transformer,
            ..self
        }
    }

    /// What to do with request-local failures. Defaults to
    /// [`ErrorPolicy::Respond`].
    pub fn error_policy(self, error_policy: ErrorPolicy) -> Self {
        ResponseFilterBuilder {
            error_policy,
            ..self
        }
    }

    /// Largest response body accepted, in bytes. Unlimited by default.
    pub fn body_limit(self, limit: usize) -> Self {
        ResponseFilterBuilder {
            body_limit: Some(limit),
            ..self
        }
    }

    /// Builds the filter.
    pub fn build(self) -> ResponseFilter {
        ResponseFilter {
            selector: self.selector,
            decider: Decider::new(self.transformer),
            error_policy: self.error_policy,
            body_limit: self.body_limit,
        }
    }
}

impl Default for ResponseFilterBuilder {
    fn default() -> Self {
        Self {
            selector: Arc::new(HeaderSelector::default()),
            transformer: Transformer::new(JsonPath, ShapePolicy::default()),
            error_policy: ErrorPolicy::default(),
            body_limit: None,
        }
    }
}
