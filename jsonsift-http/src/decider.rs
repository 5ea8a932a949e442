//! Passthrough or transform.

use http::StatusCode;
use http::header::CONTENT_ENCODING;
use jsonsift_core::{FilterOutcome, Transformer};
use tracing::debug;

use crate::selector::FilterRequest;
use crate::sink::CapturedResponse;

const JSON_MEDIA_TYPE: &str = "application/json";

/// Chooses the [`FilterOutcome`] for a captured response.
///
/// A response is handed to the [`Transformer`] only when its `Content-Type`
/// contains `application/json` (case-insensitive), its status allows a body
/// and its body is not content-encoded. Everything else passes through
/// untouched and the query, if any, is ignored.
#[derive(Debug, Clone)]
pub struct Decider {
    transformer: Transformer,
}

impl Decider {
    /// Creates a decider delegating JSON bodies to `transformer`.
    pub fn new(transformer: Transformer) -> Self {
        Self { transformer }
    }

    /// The transformer used for JSON bodies.
    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }

    /// Decides what to send for `captured`.
    pub fn decide(&self, captured: &CapturedResponse, request: &FilterRequest) -> FilterOutcome {
        if let Some(reason) = passthrough_reason(captured) {
            debug!(reason, status = %captured.status(), "passing response through");
            return FilterOutcome::Passthrough(captured.body().clone());
        }

        let outcome = self.transformer.transform(captured.body(), request.query());
        debug!(
            outcome = outcome.label(),
            source = ?request.source(),
            status = %captured.status(),
            "json response processed"
        );
        outcome
    }
}

fn passthrough_reason(captured: &CapturedResponse) -> Option<&'static str> {
    if !allows_body(captured.status()) {
        return Some("status without body");
    }
    if !is_json(captured.content_type()) {
        return Some("not json");
    }
    if is_encoded(captured) {
        return Some("content-encoded body");
    }
    None
}

fn allows_body(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|value| value.to_ascii_lowercase().contains(JSON_MEDIA_TYPE))
}

fn is_encoded(captured: &CapturedResponse) -> bool {
    captured
        .headers()
        .get_all(CONTENT_ENCODING)
        .iter()
        .any(|value| !value.as_bytes().eq_ignore_ascii_case(b"identity"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::HeaderMap;
    use http::header::CONTENT_TYPE;
    use jsonsift_core::{ErrorKind, JsonPath, ShapePolicy};
    use serde_json::json;

    use crate::selector::QuerySource;

    fn decider() -> Decider {
        Decider::new(Transformer::new(JsonPath, ShapePolicy::Any))
    }

    fn captured(
        status: StatusCode,
        headers: &[(&str, &str)],
        body: &'static [u8],
    ) -> CapturedResponse {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(
                http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        CapturedResponse::new(status, map, Bytes::from_static(body))
    }

    fn query(q: &str) -> FilterRequest {
        FilterRequest::new(q, QuerySource::Header)
    }

    #[test]
    fn content_type_match_is_a_case_insensitive_substring() {
        assert!(is_json(Some("application/json")));
        assert!(is_json(Some("Application/JSON; charset=utf-8")));
        assert!(is_json(Some("application/json-patch+json")));
        assert!(!is_json(Some("text/plain")));
        assert!(!is_json(Some("application/problem+json")));
        assert!(!is_json(None));
    }

    #[test]
    fn non_json_passes_through_with_query() {
        let response = captured(StatusCode::OK, &[("content-type", "text/plain")], br#"{"a":1}"#);
        match decider().decide(&response, &query("$.a")) {
            FilterOutcome::Passthrough(body) => assert_eq!(body.as_ref(), br#"{"a":1}"#),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn json_is_filtered() {
        let response = captured(
            StatusCode::OK,
            &[("content-type", "application/json; charset=utf-8")],
            br#"{"a":1,"b":{"c":2}}"#,
        );
        match decider().decide(&response, &query("$.b")) {
            FilterOutcome::Filtered(value) => assert_eq!(value, json!({"c": 2})),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn broken_json_is_a_decode_failure() {
        let response = captured(
            StatusCode::OK,
            &[("content-type", "application/json")],
            b"not json",
        );
        match decider().decide(&response, &FilterRequest::none()) {
            FilterOutcome::Error(error) => assert_eq!(error.kind(), ErrorKind::DecodeFailure),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn bodyless_statuses_pass_through() {
        for status in [StatusCode::NO_CONTENT, StatusCode::NOT_MODIFIED] {
            let response = captured(status, &[("content-type", "application/json")], b"");
            assert!(decider().decide(&response, &query("$.a")).is_passthrough());
        }
    }

    #[test]
    fn encoded_bodies_pass_through() {
        let response = captured(
            StatusCode::OK,
            &[("content-type", "application/json"), ("content-encoding", "gzip")],
            b"\x1f\x8b",
        );
        assert!(decider().decide(&response, &query("$.a")).is_passthrough());

        let response = captured(
            StatusCode::OK,
            &[("content-type", "application/json"), ("content-encoding", "identity")],
            br#"{"a":1}"#,
        );
        assert!(!decider().decide(&response, &query("$.a")).is_passthrough());
    }
}
