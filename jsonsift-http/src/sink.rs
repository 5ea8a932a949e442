//! Write-once response sinks.
//!
//! A real HTTP transport accepts header changes only until the response head
//! is sent, and sends the head at the latest when the first body byte is
//! written. [`ResponseSink`] models that contract as a small state machine
//! ([`WriteState`]) so that an origin handler behaves the same whether it
//! writes to the client directly or into a [`CaptureSink`].
//!
//! ```text
//!            write_head(status)            write(bytes)
//!   Idle ─────────────────────▶ HeadersSet ─────────────▶ BodyStarted
//!     │                                                      ▲
//!     └──────────────── write(bytes), status 200 ────────────┘
//! ```

use bytes::{Bytes, BytesMut};
use http::header::CONTENT_TYPE;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Response, StatusCode, Version};
use thiserror::Error;
use tracing::trace;

/// Where a sink is in the write-once sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteState {
    /// Nothing committed; headers may change.
    #[default]
    Idle,
    /// Status and headers committed, no body yet.
    HeadersSet,
    /// At least one body write accepted.
    BodyStarted,
}

impl WriteState {
    /// `true` once the status and headers can no longer change.
    pub fn is_committed(self) -> bool {
        !matches!(self, WriteState::Idle)
    }
}

/// A sink rejected a write.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Header mutation after the head was committed.
    #[error("response headers already sent")]
    HeadersCommitted,

    /// The body grew past the configured limit.
    #[error("response body exceeds {limit} bytes")]
    LimitExceeded {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// The write surface of an HTTP response.
///
/// Header mutations are accepted only while [`ResponseSink::state`] is
/// [`WriteState::Idle`]. The first [`ResponseSink::write_head`] commits the
/// status and headers; later calls are ignored. A body write from `Idle`
/// commits status 200 first.
pub trait ResponseSink {
    /// Adds a header value, keeping existing values for the same name.
    fn append_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), SinkError>;

    /// Sets a header, replacing existing values for the same name.
    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), SinkError>;

    /// Removes every value of a header.
    fn remove_header(&mut self, name: &HeaderName) -> Result<(), SinkError>;

    /// Commits status and headers. Ignored once committed.
    fn write_head(&mut self, status: StatusCode) -> Result<(), SinkError>;

    /// Appends body bytes.
    fn write(&mut self, chunk: &[u8]) -> Result<(), SinkError>;

    /// Current write state.
    fn state(&self) -> WriteState;

    /// Appends every value of every header in `headers`.
    fn append_headers(&mut self, headers: &HeaderMap) -> Result<(), SinkError> {
        for (name, value) in headers {
            self.append_header(name.clone(), value.clone())?;
        }
        Ok(())
    }
}

impl<S> ResponseSink for &mut S
where
    S: ResponseSink + ?Sized,
{
    fn append_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), SinkError> {
        (**self).append_header(name, value)
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), SinkError> {
        (**self).insert_header(name, value)
    }

    fn remove_header(&mut self, name: &HeaderName) -> Result<(), SinkError> {
        (**self).remove_header(name)
    }

    fn write_head(&mut self, status: StatusCode) -> Result<(), SinkError> {
        (**self).write_head(status)
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), SinkError> {
        (**self).write(chunk)
    }

    fn state(&self) -> WriteState {
        (**self).state()
    }
}

/// Buffered state shared by [`CaptureSink`] and [`ResponseWriter`].
#[derive(Debug)]
struct Buffer {
    state: WriteState,
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    limit: Option<usize>,
}

impl Buffer {
    fn new(limit: Option<usize>) -> Self {
        Self {
            state: WriteState::Idle,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            limit,
        }
    }

    fn mutable_headers(&mut self) -> Result<&mut HeaderMap, SinkError> {
        match self.state {
            WriteState::Idle => Ok(&mut self.headers),
            _ => Err(SinkError::HeadersCommitted),
        }
    }
}

impl ResponseSink for Buffer {
    fn append_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), SinkError> {
        self.mutable_headers()?.append(name, value);
        Ok(())
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), SinkError> {
        self.mutable_headers()?.insert(name, value);
        Ok(())
    }

    fn remove_header(&mut self, name: &HeaderName) -> Result<(), SinkError> {
        self.mutable_headers()?.remove(name);
        Ok(())
    }

    fn write_head(&mut self, status: StatusCode) -> Result<(), SinkError> {
        if self.state.is_committed() {
            trace!(%status, committed = %self.status, "ignoring repeated write_head");
            return Ok(());
        }
        self.status = status;
        self.state = WriteState::HeadersSet;
        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), SinkError> {
        if self.state == WriteState::Idle {
            self.write_head(StatusCode::OK)?;
        }
        if let Some(limit) = self.limit
            && self.body.len() + chunk.len() > limit
        {
            return Err(SinkError::LimitExceeded { limit });
        }
        self.body.extend_from_slice(chunk);
        self.state = WriteState::BodyStarted;
        Ok(())
    }

    fn state(&self) -> WriteState {
        self.state
    }
}

/// Stands in for the real response while an origin handler runs.
///
/// Everything the handler writes is recorded and nothing leaves the
/// process. Call [`CaptureSink::into_captured`] once the handler returns.
#[derive(Debug)]
pub struct CaptureSink {
    buffer: Buffer,
}

impl CaptureSink {
    /// Creates an unbounded capture sink.
    pub fn new() -> Self {
        Self {
            buffer: Buffer::new(None),
        }
    }

    /// Creates a capture sink that rejects bodies larger than `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Buffer::new(Some(limit)),
        }
    }

    /// Status written so far (200 until set).
    pub fn status(&self) -> StatusCode {
        self.buffer.status
    }

    /// Headers written so far.
    pub fn headers(&self) -> &HeaderMap {
        &self.buffer.headers
    }

    /// Body written so far.
    pub fn body(&self) -> &[u8] {
        &self.buffer.body
    }

    /// Finishes the capture.
    pub fn into_captured(self) -> CapturedResponse {
        CapturedResponse::new(
            self.buffer.status,
            self.buffer.headers,
            self.buffer.body.freeze(),
        )
    }
}

impl Default for CaptureSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSink for CaptureSink {
    fn append_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), SinkError> {
        self.buffer.append_header(name, value)
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), SinkError> {
        self.buffer.insert_header(name, value)
    }

    fn remove_header(&mut self, name: &HeaderName) -> Result<(), SinkError> {
        self.buffer.remove_header(name)
    }

    fn write_head(&mut self, status: StatusCode) -> Result<(), SinkError> {
        self.buffer.write_head(status)
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), SinkError> {
        self.buffer.write(chunk)
    }

    fn state(&self) -> WriteState {
        self.buffer.state
    }
}

/// Sink that assembles an [`http::Response`] for frameworks which return
/// responses instead of writing them.
#[derive(Debug)]
pub struct ResponseWriter {
    buffer: Buffer,
}

impl ResponseWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self {
            buffer: Buffer::new(None),
        }
    }

    /// Builds the response from everything written.
    pub fn finish(self) -> Response<Bytes> {
        let mut response = Response::new(self.buffer.body.freeze());
        *response.status_mut() = self.buffer.status;
        *response.headers_mut() = self.buffer.headers;
        response
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSink for ResponseWriter {
    fn append_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), SinkError> {
        self.buffer.append_header(name, value)
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), SinkError> {
        self.buffer.insert_header(name, value)
    }

    fn remove_header(&mut self, name: &HeaderName) -> Result<(), SinkError> {
        self.buffer.remove_header(name)
    }

    fn write_head(&mut self, status: StatusCode) -> Result<(), SinkError> {
        self.buffer.write_head(status)
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), SinkError> {
        self.buffer.write(chunk)
    }

    fn state(&self) -> WriteState {
        self.buffer.state
    }
}

/// A fully buffered origin response.
///
/// Owned by one request. Version and extensions are only known when the
/// response came from an [`http::Response`]; a [`CaptureSink`] leaves them
/// at HTTP/1.1 and empty.
#[derive(Debug)]
pub struct CapturedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    version: Version,
    extensions: Extensions,
}

impl CapturedResponse {
    /// Creates a captured response.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            version: Version::HTTP_11,
            extensions: Extensions::new(),
        }
    }

    /// Sets the HTTP version.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Sets the response extensions.
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    /// Origin status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Origin headers, every value kept.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Origin body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Origin HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// `Content-Type`, if present and valid ASCII.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Moves the extensions out, leaving them empty.
    pub fn take_extensions(&mut self) -> Extensions {
        std::mem::take(&mut self.extensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::SET_COOKIE;

    #[test]
    fn body_write_defaults_status_to_ok() {
        let mut sink = CaptureSink::new();
        sink.write(b"hello").unwrap();
        assert_eq!(sink.state(), WriteState::BodyStarted);
        assert_eq!(sink.status(), StatusCode::OK);

        let captured = sink.into_captured();
        assert_eq!(captured.status(), StatusCode::OK);
        assert_eq!(captured.body().as_ref(), b"hello");
    }

    #[test]
    fn nothing_written_is_an_empty_ok() {
        let captured = CaptureSink::new().into_captured();
        assert_eq!(captured.status(), StatusCode::OK);
        assert!(captured.body().is_empty());
        assert!(captured.headers().is_empty());
    }

    #[test]
    fn first_status_wins() {
        let mut sink = CaptureSink::new();
        sink.write_head(StatusCode::CREATED).unwrap();
        sink.write_head(StatusCode::INTERNAL_SERVER_ERROR).unwrap();
        assert_eq!(sink.state(), WriteState::HeadersSet);
        sink.write(b"{}").unwrap();
        sink.write_head(StatusCode::NOT_FOUND).unwrap();
        assert_eq!(sink.status(), StatusCode::CREATED);
    }

    #[test]
    fn headers_are_locked_after_commit() {
        let mut sink = CaptureSink::new();
        sink.insert_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .unwrap();
        sink.write_head(StatusCode::OK).unwrap();

        let result = sink.insert_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(matches!(result, Err(SinkError::HeadersCommitted)));
        assert!(matches!(
            sink.remove_header(&CONTENT_TYPE),
            Err(SinkError::HeadersCommitted)
        ));
        assert_eq!(sink.headers()[CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn headers_are_locked_after_first_body_byte() {
        let mut sink = CaptureSink::new();
        sink.write(b"x").unwrap();
        let result = sink.append_header(SET_COOKIE, HeaderValue::from_static("a=1"));
        assert!(matches!(result, Err(SinkError::HeadersCommitted)));
    }

    #[test]
    fn writes_accumulate_in_order() {
        let mut sink = CaptureSink::new();
        for chunk in [&b"{\"a\""[..], &b":"[..], &b"1}"[..]] {
            sink.write(chunk).unwrap();
        }
        assert_eq!(sink.body(), br#"{"a":1}"#);
    }

    #[test]
    fn multi_value_headers_are_kept() {
        let mut sink = CaptureSink::new();
        sink.append_header(SET_COOKIE, HeaderValue::from_static("a=1"))
            .unwrap();
        sink.append_header(SET_COOKIE, HeaderValue::from_static("b=2"))
            .unwrap();
        let captured = sink.into_captured();
        let cookies: Vec<_> = captured.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies, ["a=1", "b=2"]);
    }

    #[test]
    fn limit_is_enforced() {
        let mut sink = CaptureSink::with_limit(4);
        sink.write(b"abc").unwrap();
        sink.write(b"d").unwrap();
        assert!(matches!(
            sink.write(b"e"),
            Err(SinkError::LimitExceeded { limit: 4 })
        ));
        assert_eq!(sink.body(), b"abcd");
    }

    #[test]
    fn writer_builds_a_response() {
        let mut writer = ResponseWriter::new();
        writer
            .insert_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .unwrap();
        writer.write_head(StatusCode::ACCEPTED).unwrap();
        writer.write(b"{}").unwrap();

        let response = writer.finish();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.body().as_ref(), b"{}");
    }
}
