//! Response filter middleware for reqwest-middleware.

use std::sync::Arc;

use async_trait::async_trait;
use http::Extensions;
use jsonsift_http::{ResponseFilter, capture_response};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};
use tracing::debug;

/// Filters JSON responses received by a reqwest client.
///
/// The query is read from the outgoing request (by default the
/// `X-JsonPath` header, which is still sent upstream), the response is
/// buffered and the filtered response is handed back to the caller.
/// Errors that the filter does not answer itself surface as
/// [`reqwest_middleware::Error::Middleware`].
#[derive(Debug, Clone, Default)]
pub struct SiftMiddleware {
    filter: Arc<ResponseFilter>,
}

impl SiftMiddleware {
    /// Creates the middleware from a configured filter.
    pub fn new(filter: ResponseFilter) -> Self {
        Self {
            filter: Arc::new(filter),
        }
    }
}

impl From<ResponseFilter> for SiftMiddleware {
    fn from(filter: ResponseFilter) -> Self {
        Self::new(filter)
    }
}

#[async_trait]
impl Middleware for SiftMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let http_request: http::Request<reqwest::Body> = req
            .try_into()
            .map_err(|e: reqwest::Error| reqwest_middleware::Error::Reqwest(e))?;
        let (parts, body) = http_request.into_parts();
        let filter_request = self.filter.extract_query(&parts);
        let method = parts.method.clone();
        let req: Request = http::Request::from_parts(parts, body)
            .try_into()
            .map_err(|e: reqwest::Error| reqwest_middleware::Error::Reqwest(e))?;

        let response = next.run(req, extensions).await?;
        let url = response.url().clone();

        let http_response: http::Response<reqwest::Body> = response.into();
        let captured = capture_response(http_response, self.filter.body_limit())
            .await
            .map_err(reqwest_middleware::Error::middleware)?;

        let outcome = self.filter.decide(&method, &captured, &filter_request);
        debug!(%url, outcome = outcome.label(), "filtering client response");
        let filtered = self
            .filter
            .respond(captured, outcome)
            .map_err(reqwest_middleware::Error::middleware)?;

        Ok(filtered.map(reqwest::Body::from).into())
    }
}
