use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, SET_COOKIE};
use http::{HeaderValue, Method, Request, Response, StatusCode};
use jsonsift_core::{ErrorKind, Jq, ShapePolicy};
use jsonsift_http::{
    ErrorPolicy, HandleError, Origin, QueryParamSelector, ResponseFilter, ResponseSink,
    ResponseWriter, SinkError, WriteState,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

/// Writes a fixed response, optionally chunked.
struct Fixed {
    status: StatusCode,
    content_type: &'static str,
    chunks: Vec<&'static [u8]>,
}

impl Fixed {
    fn new(content_type: &'static str, body: &'static [u8]) -> Self {
        Self {
            status: StatusCode::OK,
            content_type,
            chunks: vec![body],
        }
    }
}

#[async_trait]
impl Origin<()> for Fixed {
    type Error = SinkError;

    async fn serve(
        &self,
        _request: Request<()>,
        sink: &mut (dyn ResponseSink + Send),
    ) -> Result<(), SinkError> {
        sink.insert_header(CONTENT_TYPE, HeaderValue::from_static(self.content_type))?;
        sink.append_header(SET_COOKIE, HeaderValue::from_static("session=1"))?;
        sink.append_header(SET_COOKIE, HeaderValue::from_static("theme=dark"))?;
        sink.write_head(self.status)?;
        for chunk in &self.chunks {
            sink.write(chunk)?;
        }
        Ok(())
    }
}

/// Fails before writing anything.
struct Broken;

#[async_trait]
impl Origin<()> for Broken {
    type Error = std::io::Error;

    async fn serve(
        &self,
        _request: Request<()>,
        _sink: &mut (dyn ResponseSink + Send),
    ) -> Result<(), std::io::Error> {
        Err(std::io::Error::other("upstream down"))
    }
}

fn request(query: Option<&str>) -> Request<()> {
    let mut builder = Request::builder().uri("/resource");
    if let Some(query) = query {
        builder = builder.header("X-JsonPath", query);
    }
    builder.body(()).unwrap()
}

async fn run<O>(filter: &ResponseFilter, request: Request<()>, origin: &O) -> Response<Bytes>
where
    O: Origin<()>,
    O::Error: std::fmt::Debug,
{
    let mut writer = ResponseWriter::new();
    filter.handle(request, origin, &mut writer).await.unwrap();
    writer.finish()
}

fn json_body(response: &Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

#[tokio::test]
async fn filters_sub_object() {
    let origin = Fixed::new("application/json", br#"{"a":1,"b":{"c":2}}"#);
    let response = run(&ResponseFilter::default(), request(Some("$.b")), &origin).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    assert_eq!(response.body().as_ref(), br#"{"c":2}"#);
    assert_eq!(
        response.headers()[CONTENT_LENGTH],
        response.body().len().to_string().as_str()
    );
}

#[tokio::test]
async fn non_json_is_byte_identical() {
    let origin = Fixed::new("text/plain", br#"{"a":1}"#);
    let response = run(&ResponseFilter::default(), request(Some("$.a")), &origin).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
    assert_eq!(response.headers().get(CONTENT_LENGTH), None);
    assert_eq!(response.body().as_ref(), br#"{"a":1}"#);
}

#[tokio::test]
async fn invalid_json_is_never_a_success() {
    let origin = Fixed::new("application/json", b"not json");
    let response = run(&ResponseFilter::default(), request(Some("$.a")), &origin).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(&response)["error"]["kind"], "decode_failure");
}

#[tokio::test]
async fn missing_path_is_a_client_error() {
    let origin = Fixed::new("application/json", br#"{"a":1}"#);
    let response = run(
        &ResponseFilter::default(),
        request(Some("$.nonexistent")),
        &origin,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&response)["error"]["kind"], "query_failure");
}

#[tokio::test]
async fn no_query_returns_the_document() {
    let origin = Fixed::new("application/json", br#"{ "a" : 1 }"#);
    let response = run(&ResponseFilter::default(), request(None), &origin).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(&response), json!({"a": 1}));
}

#[tokio::test]
async fn chunked_writes_are_reassembled() {
    let origin = Fixed {
        status: StatusCode::CREATED,
        content_type: "application/json; charset=utf-8",
        chunks: vec![&b"{\"items\":"[..], &b"[{\"id\":1},"[..], &b"{\"id\":2}]}"[..]],
    };
    let response = run(
        &ResponseFilter::default(),
        request(Some("$.items[*].id")),
        &origin,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(&response), json!([1, 2]));
}

#[tokio::test]
async fn set_cookie_values_survive() {
    for query in [None, Some("$.b")] {
        let origin = Fixed::new("application/json", br#"{"a":1,"b":{"c":2}}"#);
        let response = run(&ResponseFilter::default(), request(query), &origin).await;
        let cookies: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies, ["session=1", "theme=dark"]);
    }

    let origin = Fixed::new("text/html", b"<p>hi</p>");
    let response = run(&ResponseFilter::default(), request(Some("$")), &origin).await;
    assert_eq!(response.headers().get_all(SET_COOKIE).iter().count(), 2);
}

#[tokio::test]
async fn head_requests_pass_through() {
    let origin = Fixed::new("application/json", b"");
    let request = Request::builder()
        .method(Method::HEAD)
        .header("X-JsonPath", "$.a")
        .body(())
        .unwrap();
    let response = run(&ResponseFilter::default(), request, &origin).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.body().is_empty());
}

#[tokio::test]
async fn abort_policy_propagates_and_writes_nothing() {
    let filter = ResponseFilter::builder()
        .error_policy(ErrorPolicy::Abort)
        .build();

    for (body, query, kind) in [
        (&b"not json"[..], "$.a", ErrorKind::DecodeFailure),
        (&br#"{"a":1}"#[..], "$.nonexistent", ErrorKind::QueryFailure),
    ] {
        let origin = Fixed::new("application/json", body);
        let mut writer = ResponseWriter::new();
        let error = filter
            .handle(request(Some(query)), &origin, &mut writer)
            .await
            .unwrap_err();

        match error {
            HandleError::Filter(error) => assert_eq!(error.kind(), kind),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(writer.state(), WriteState::Idle);
    }
}

#[tokio::test]
async fn origin_failures_propagate_unchanged() {
    let mut writer = ResponseWriter::new();
    let error = ResponseFilter::default()
        .handle(request(Some("$.a")), &Broken, &mut writer)
        .await
        .unwrap_err();

    match error {
        HandleError::Origin(error) => assert_eq!(error.to_string(), "upstream down"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(writer.state(), WriteState::Idle);
}

#[tokio::test]
async fn body_limit_fails_the_origin() {
    let filter = ResponseFilter::builder().body_limit(4).build();
    let origin = Fixed::new("application/json", br#"{"a":12345}"#);
    let mut writer = ResponseWriter::new();

    let error = filter
        .handle(request(None), &origin, &mut writer)
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        HandleError::Origin(SinkError::LimitExceeded { limit: 4 })
    ));
    assert_eq!(writer.state(), WriteState::Idle);
}

#[tokio::test]
async fn object_shape_policy_with_query_params_and_jq() {
    let filter = ResponseFilter::builder()
        .selector(QueryParamSelector::default())
        .evaluator(Jq, ShapePolicy::Object)
        .build();
    let origin = Fixed::new(
        "application/json",
        br#"{"user":{"name":"ann","roles":["admin"]}}"#,
    );

    let ok = Request::builder()
        .uri("/me?jsonpath_filter=.user")
        .body(())
        .unwrap();
    let response = run(&filter, ok, &origin).await;
    assert_eq!(
        json_body(&response),
        json!({"name": "ann", "roles": ["admin"]})
    );

    let scalar = Request::builder()
        .uri("/me?jsonpath_filter=.user.name")
        .body(())
        .unwrap();
    let response = run(&filter, scalar, &origin).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&response)["error"]["kind"], "shape_mismatch");
}

#[tokio::test]
async fn refiltering_a_filtered_response_is_stable() {
    let filter = ResponseFilter::default();
    let origin = Fixed::new("application/json", br#"{"a":1,"b":{"c":{"d":2}}}"#);
    let first = run(&filter, request(Some("$.b")), &origin).await;

    let replayed = Fixed::new(
        "application/json",
        Box::leak(first.body().to_vec().into_boxed_slice()),
    );
    let second = run(&filter, request(Some("$")), &replayed).await;

    assert_eq!(second.body(), first.body());
}
