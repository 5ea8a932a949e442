use jsonsift_core::{ErrorKind, FilterOutcome, Jq, JsonPath, ShapePolicy, Transformer};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn filtered(outcome: FilterOutcome) -> Value {
    match outcome {
        FilterOutcome::Filtered(value) => value,
        other => panic!("expected a filtered outcome, got {other:?}"),
    }
}

fn error_kind(outcome: FilterOutcome) -> ErrorKind {
    match outcome {
        FilterOutcome::Error(error) => error.kind(),
        other => panic!("expected an error outcome, got {other:?}"),
    }
}

#[test]
fn sub_object_query() {
    let transformer = Transformer::new(JsonPath, ShapePolicy::Any);
    let value = filtered(transformer.transform(br#"{"a":1,"b":{"c":2}}"#, Some("$.b")));
    assert_eq!(value, json!({"c": 2}));
}

#[test]
fn invalid_body_is_decode_failure() {
    let transformer = Transformer::new(JsonPath, ShapePolicy::Any);
    assert_eq!(
        error_kind(transformer.transform(b"not json", Some("$.a"))),
        ErrorKind::DecodeFailure
    );
    assert_eq!(
        error_kind(transformer.transform(b"not json", None)),
        ErrorKind::DecodeFailure
    );
}

#[test]
fn missing_path_is_query_failure() {
    let transformer = Transformer::new(JsonPath, ShapePolicy::Any);
    assert_eq!(
        error_kind(transformer.transform(br#"{"a":1}"#, Some("$.nonexistent"))),
        ErrorKind::QueryFailure
    );
}

#[test]
fn no_query_is_semantically_equal() {
    let transformer = Transformer::new(JsonPath, ShapePolicy::Any);
    let value = filtered(transformer.transform(br#"{ "a": 1 }"#, None));
    assert_eq!(value, json!({"a": 1}));
}

#[test]
fn key_order_is_preserved() {
    let transformer = Transformer::new(JsonPath, ShapePolicy::Any);
    let value = filtered(transformer.transform(br#"{"z":1,"a":2,"m":3}"#, None));
    assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"z":1,"a":2,"m":3}"#);
}

#[test]
fn refiltering_is_stable() {
    let transformer = Transformer::new(JsonPath, ShapePolicy::Any);
    let body = br#"{"a":1,"b":{"c":{"d":[1,2]}}}"#;

    let once = filtered(transformer.transform(body, Some("$.b")));
    let encoded = serde_json::to_vec(&once).unwrap();

    let root = filtered(transformer.transform(&encoded, Some("$")));
    assert_eq!(root, once);

    let unfiltered = filtered(transformer.transform(&encoded, None));
    assert_eq!(unfiltered, once);

    let twice = filtered(transformer.transform(body, Some("$.b")));
    assert_eq!(twice, once);
}

#[test]
fn object_policy() {
    let transformer = Transformer::new(JsonPath, ShapePolicy::Object);
    let body = br#"{"items":[{"id":1},{"id":2}],"meta":{"total":2}}"#;

    assert_eq!(
        filtered(transformer.transform(body, Some("$.meta"))),
        json!({"total": 2})
    );
    assert_eq!(
        error_kind(transformer.transform(body, Some("$.items"))),
        ErrorKind::ShapeMismatch
    );
    assert_eq!(
        error_kind(transformer.transform(body, Some("$.meta.total"))),
        ErrorKind::ShapeMismatch
    );
}

#[test]
fn any_policy_accepts_arrays_and_scalars() {
    let transformer = Transformer::new(JsonPath, ShapePolicy::Any);
    let body = br#"{"items":[{"id":1},{"id":2}]}"#;

    assert_eq!(
        filtered(transformer.transform(body, Some("$.items[*].id"))),
        json!([1, 2])
    );
    assert_eq!(
        filtered(transformer.transform(body, Some("$.items[1].id"))),
        json!(2)
    );
}

#[test]
fn jq_queries() {
    let transformer = Transformer::new(Jq, ShapePolicy::Any);
    let body = br#"{"users":[{"name":"ann","admin":true},{"name":"bob","admin":false}]}"#;

    assert_eq!(
        filtered(transformer.transform(body, Some(".users[] | select(.admin) | .name"))),
        json!("ann")
    );
    assert_eq!(
        filtered(transformer.transform(body, Some("[.users[].name]"))),
        json!(["ann", "bob"])
    );
    assert_eq!(
        error_kind(transformer.transform(body, Some(".users["))),
        ErrorKind::QueryFailure
    );
}
