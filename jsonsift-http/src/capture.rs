//! Buffering an [`http::Response`] produced by an origin service.

use std::pin::pin;

use bytes::Buf;
use http::Response;
use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::sink::{CaptureSink, CapturedResponse, ResponseSink, SinkError};

/// Boxed error used for body and service failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why an origin response could not be captured.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Reading the origin body failed.
    #[error("failed to read response body: {0}")]
    Body(#[source] BoxError),

    /// The capture sink rejected the data.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Drains `response` into a [`CapturedResponse`].
///
/// The origin's headers and status are replayed into a [`CaptureSink`],
/// then every data frame in order. Trailers are dropped. Version and
/// extensions are carried over.
pub async fn capture_response<B>(
    response: Response<B>,
    limit: Option<usize>,
) -> Result<CapturedResponse, CaptureError>
where
    B: HttpBody,
    B::Error: Into<BoxError>,
{
    let (parts, body) = response.into_parts();
    let mut sink = limit.map_or_else(CaptureSink::new, CaptureSink::with_limit);

    sink.append_headers(&parts.headers)?;
    sink.write_head(parts.status)?;

    let mut body = pin!(body);
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|error| CaptureError::Body(error.into()))?;
        if let Ok(mut data) = frame.into_data() {
            let chunk = data.copy_to_bytes(data.remaining());
            sink.write(&chunk).inspect_err(|error| {
                warn!(%error, status = %parts.status, "aborting response capture");
            })?;
        }
    }

    debug!(status = %parts.status, len = sink.body().len(), "captured response");
    Ok(sink
        .into_captured()
        .with_version(parts.version)
        .with_extensions(parts.extensions))
}
