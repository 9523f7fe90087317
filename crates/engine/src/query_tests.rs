// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn record(key: Option<&str>, value: &str) -> Record {
    Record {
        topic: "orders".into(),
        partition: 0,
        offset: 7,
        timestamp: 0,
        key: key.map(str::to_string),
        value: value.into(),
    }
}

fn query(filters: &[&str], projection: Option<&str>) -> JsonPointerQuery {
    JsonPointerQuery::parse(filters, projection).unwrap()
}

#[test]
fn empty_query_passes_everything_through() {
    let q = JsonPointerQuery::default();
    assert!(q.is_pass_through());
    assert_eq!(q.apply(record(None, "raw")), Some(record(None, "raw")));
}

#[yare::parameterized(
    key_match        = { "key=c-1", true },
    key_mismatch     = { "key=c-2", false },
    contains         = { "value~shipped", true },
    not_contains     = { "value~cancelled", false },
    pointer_string   = { "/status=shipped", true },
    pointer_quoted   = { r#"/status="shipped""#, true },
    pointer_number   = { "/order/total=42", true },
    pointer_wrong    = { "/order/total=41", false },
    pointer_missing  = { "/missing=1", false },
)]
fn single_filters(filter: &str, passes: bool) {
    let r = record(Some("c-1"), r#"{"status":"shipped","order":{"total":42}}"#);
    assert_eq!(query(&[filter], None).apply(r).is_some(), passes);
}

#[test]
fn pointer_filter_on_non_json_value_fails_closed() {
    assert!(query(&["/a=1"], None).apply(record(None, "not json")).is_none());
}

#[test]
fn filters_combine_with_and() {
    let r = record(Some("c-1"), r#"{"status":"shipped"}"#);
    assert!(query(&["key=c-1", "/status=shipped"], None).apply(r.clone()).is_some());
    assert!(query(&["key=c-1", "/status=open"], None).apply(r).is_none());
}

#[test]
fn projection_replaces_value() {
    let q = query(&[], Some("/order"));
    let projected = q.apply(record(None, r#"{"order":{"total":42}}"#)).unwrap();
    assert_eq!(projected.value, r#"{"total":42}"#);
    assert_eq!(projected.offset, 7);

    let text = query(&[], Some("/name")).apply(record(None, r#"{"name":"ada"}"#)).unwrap();
    assert_eq!(text.value, "ada");
}

#[test]
fn projection_of_missing_field_is_null() {
    let q = query(&[], Some("/nope"));
    assert_eq!(q.apply(record(None, r#"{"a":1}"#)).unwrap().value, "null");
}

#[yare::parameterized(
    no_operator    = { "status" },
    bare_pointer   = { "status=open" },
)]
fn invalid_filters(raw: &str) {
    assert_eq!(
        JsonPointerQuery::parse(&[raw], None),
        Err(QueryError::InvalidFilter(raw.to_string()))
    );
}

#[test]
fn projection_must_be_a_pointer() {
    assert_eq!(
        JsonPointerQuery::parse::<&str>(&[], Some("order.total")),
        Err(QueryError::InvalidProjection("order.total".into()))
    );
}
