use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Request, Response};
use http_body::Body as HttpBody;
use http_body_util::Full;
use jsonsift_http::{BoxError, ResponseFilter, capture_response};
use tower::Service;
use tracing::debug;

/// Future returned by [`SiftService`].
pub type SiftFuture = BoxFuture<'static, Result<Response<Full<Bytes>>, BoxError>>;

/// Service that buffers the upstream response and filters it.
///
/// Upstream errors, capture failures and, under
/// [`ErrorPolicy::Abort`](jsonsift_http::ErrorPolicy::Abort), filter errors
/// are returned as [`BoxError`]. Wrap the service in
/// `axum::error_handling::HandleErrorLayer` when the framework requires an
/// infallible service.
pub struct SiftService<S> {
    upstream: S,
    filter: Arc<ResponseFilter>,
}

impl<S> SiftService<S> {
    /// Wraps `upstream`.
    pub fn new(upstream: S, filter: Arc<ResponseFilter>) -> Self {
        SiftService { upstream, filter }
    }
}

impl<S> Clone for SiftService<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            filter: self.filter.clone(),
        }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for SiftService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    ReqBody: Send + 'static,
    ResBody: HttpBody + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<Full<Bytes>>;
    type Error = BoxError;
    type Future = SiftFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.upstream.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        // Keep the instance that was driven to readiness.
        let clone = self.upstream.clone();
        let mut upstream = std::mem::replace(&mut self.upstream, clone);
        let filter = Arc::clone(&self.filter);

        let (parts, body) = request.into_parts();
        let filter_request = filter.extract_query(&parts);
        let method = parts.method.clone();
        let request = Request::from_parts(parts, body);

        Box::pin(async move {
            let response = upstream.call(request).await.map_err(Into::<BoxError>::into)?;
            let captured = capture_response(response, filter.body_limit()).await?;

            let outcome = filter.decide(&method, &captured, &filter_request);
            debug!(%method, outcome = outcome.label(), "replaying response");
            let response = filter.respond(captured, outcome)?;
            Ok::<_, BoxError>(response.map(Full::new))
        })
    }
}
