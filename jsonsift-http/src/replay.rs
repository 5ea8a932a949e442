//! The single authoritative write of a filtered response.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue, StatusCode};
use jsonsift_core::{ErrorKind, FilterError, FilterOutcome};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::sink::{CapturedResponse, ResponseSink};

/// What to do when a JSON response cannot be filtered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorPolicy {
    /// Answer with a JSON error document: 400 for query and shape failures,
    /// 502 when the origin sent invalid JSON.
    #[default]
    Respond,
    /// Write nothing and return the error to the caller.
    Abort,
}

/// Writes the response for `outcome` to `sink`.
///
/// Headers are finalized before the first body byte. A passthrough is
/// byte-identical to the capture. Any other body is JSON: `Content-Type` is
/// forced to `application/json`, `Content-Length` is recomputed and
/// `Transfer-Encoding` is dropped. Every other origin header is kept.
pub fn replay<S>(
    captured: &CapturedResponse,
    outcome: FilterOutcome,
    policy: ErrorPolicy,
    sink: &mut S,
) -> Result<(), FilterError>
where
    S: ResponseSink + ?Sized,
{
    match outcome {
        FilterOutcome::Passthrough(body) => {
            passthrough(captured, &body, sink).map_err(FilterError::write)
        }
        FilterOutcome::Filtered(value) => {
            let body = serde_json::to_vec(&value).map_err(FilterError::Encode)?;
            write_json(captured.headers(), captured.status(), &body, sink)
                .map_err(FilterError::write)
        }
        FilterOutcome::Error(error) => match policy {
            ErrorPolicy::Respond if error.is_request_local() => {
                let (status, body) = error_document(&error)?;
                warn!(kind = %error.kind(), %status, %error, "responding with filter error");
                write_json(captured.headers(), status, &body, sink).map_err(FilterError::write)
            }
            _ => {
                warn!(kind = %error.kind(), %error, "aborting filtered response");
                Err(error)
            }
        },
    }
}

fn passthrough<S>(
    captured: &CapturedResponse,
    body: &Bytes,
    sink: &mut S,
) -> Result<(), crate::sink::SinkError>
where
    S: ResponseSink + ?Sized,
{
    sink.append_headers(captured.headers())?;
    sink.write_head(captured.status())?;
    if !body.is_empty() {
        sink.write(body)?;
    }
    Ok(())
}

fn write_json<S>(
    origin_headers: &HeaderMap,
    status: StatusCode,
    body: &[u8],
    sink: &mut S,
) -> Result<(), crate::sink::SinkError>
where
    S: ResponseSink + ?Sized,
{
    for (name, value) in origin_headers {
        // The body is re-framed with a fixed length.
        if name != CONTENT_LENGTH && name != CONTENT_TYPE && name != TRANSFER_ENCODING {
            sink.append_header(name.clone(), value.clone())?;
        }
    }
    sink.insert_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))?;
    sink.insert_header(CONTENT_LENGTH, HeaderValue::from(body.len()))?;
    sink.write_head(status)?;
    debug!(%status, len = body.len(), "writing json body");
    sink.write(body)
}

fn error_document(error: &FilterError) -> Result<(StatusCode, Vec<u8>), FilterError> {
    let status = match error.kind() {
        ErrorKind::DecodeFailure => StatusCode::BAD_GATEWAY,
        _ => StatusCode::BAD_REQUEST,
    };
    let document = json!({
        "error": {
            "kind": error.kind().as_str(),
            "message": error.to_string(),
        }
    });
    let body = serde_json::to_vec(&document).map_err(FilterError::Encode)?;
    Ok((status, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::SET_COOKIE;
    use jsonsift_core::QueryError;
    use serde_json::Value;

    use crate::sink::{ResponseWriter, SinkError, WriteState};

    fn captured(content_type: &str, body: &'static [u8]) -> CapturedResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, content_type.parse().unwrap());
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        CapturedResponse::new(StatusCode::CREATED, headers, Bytes::from_static(body))
    }

    fn no_match() -> FilterError {
        QueryError::NoMatch {
            query: "$.nonexistent".into(),
        }
        .into()
    }

    #[test]
    fn passthrough_is_identical() {
        let captured = captured("text/plain", br#"{"a":1}"#);
        let mut writer = ResponseWriter::new();
        replay(
            &captured,
            FilterOutcome::Passthrough(captured.body().clone()),
            ErrorPolicy::Respond,
            &mut writer,
        )
        .unwrap();

        let response = writer.finish();
        assert_eq!(response.status(), captured.status());
        assert_eq!(response.headers(), captured.headers());
        assert_eq!(response.body(), captured.body());
    }

    #[test]
    fn filtered_rewrites_content_headers() {
        let captured = captured("application/json; charset=utf-8", br#"{"a":1,"b":{"c":2}}"#);
        let mut writer = ResponseWriter::new();
        replay(
            &captured,
            FilterOutcome::Filtered(json!({"c": 2})),
            ErrorPolicy::Respond,
            &mut writer,
        )
        .unwrap();

        let response = writer.finish();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()[CONTENT_LENGTH], "7");
        assert_eq!(response.headers().get_all(SET_COOKIE).iter().count(), 2);
        assert_eq!(response.body().as_ref(), br#"{"c":2}"#);
    }

    #[test]
    fn filtered_drops_chunked_framing() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        let captured =
            CapturedResponse::new(StatusCode::OK, headers, Bytes::from_static(br#"{"a":[1,2]}"#));

        let mut writer = ResponseWriter::new();
        replay(
            &captured,
            FilterOutcome::Filtered(json!([1, 2])),
            ErrorPolicy::Respond,
            &mut writer,
        )
        .unwrap();

        let response = writer.finish();
        assert!(response.headers().get(TRANSFER_ENCODING).is_none());
        assert_eq!(response.headers()[CONTENT_LENGTH], "5");
        assert_eq!(response.body().as_ref(), b"[1,2]");
    }

    #[test]
    fn respond_policy_writes_an_error_document() {
        let captured = captured("application/json", br#"{"a":1}"#);
        let mut writer = ResponseWriter::new();
        replay(
            &captured,
            FilterOutcome::Error(no_match()),
            ErrorPolicy::Respond,
            &mut writer,
        )
        .unwrap();

        let response = writer.finish();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"]["kind"], "query_failure");
        assert_eq!(body["error"]["message"], "query `$.nonexistent` matched nothing");
    }

    #[test]
    fn decode_failures_are_bad_gateway() {
        let captured = captured("application/json", b"not json");
        let decode = serde_json::from_slice::<Value>(b"not json").unwrap_err();
        let mut writer = ResponseWriter::new();
        replay(
            &captured,
            FilterOutcome::Error(decode.into()),
            ErrorPolicy::Respond,
            &mut writer,
        )
        .unwrap();
        assert_eq!(writer.finish().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn abort_policy_writes_nothing() {
        let captured = captured("application/json", br#"{"a":1}"#);
        let mut writer = ResponseWriter::new();
        let error = replay(
            &captured,
            FilterOutcome::Error(no_match()),
            ErrorPolicy::Abort,
            &mut writer,
        )
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::QueryFailure);
        assert_eq!(writer.state(), WriteState::Idle);
    }

    #[test]
    fn sink_failures_are_write_failures() {
        let captured = captured("text/plain", b"hello");
        let mut writer = ResponseWriter::new();
        writer.write(b"already started").unwrap();

        let error = replay(
            &captured,
            FilterOutcome::Passthrough(captured.body().clone()),
            ErrorPolicy::Respond,
            &mut writer,
        )
        .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::WriteFailure);
        assert!(matches!(
            std::error::Error::source(&error).and_then(|source| source.downcast_ref::<SinkError>()),
            Some(SinkError::HeadersCommitted)
        ));
    }
}
