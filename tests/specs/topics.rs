// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kr topics`, `kr describe`, `kr offsets`

use crate::prelude::*;
use crate::prelude::assert_eq;

#[test]
fn topics_lists_user_topics() {
    Project::memory(ORDERS)
        .kr()
        .args(&["topics"])
        .passes()
        .stdout_has("orders")
        .stdout_lacks("__consumer_offsets");
}

#[test]
fn topics_all_as_json() {
    let run = Project::memory(ORDERS).kr().args(&["topics", "--all", "-o", "json"]).passes();
    let names: Vec<_> = run.json_lines().iter().map(|t| t["name"].as_str().unwrap().to_string()).collect();
    assert_eq!(names, ["__consumer_offsets", "orders"]);
}

#[test]
fn describe_reports_watermarks() {
    let run = Project::memory(ORDERS).kr().args(&["describe", "orders", "-o", "json"]).passes();
    let description = &run.json_lines()[0];
    let latest: Vec<_> = description["partitions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["latest_offset"].as_i64().unwrap())
        .collect();
    assert_eq!(latest, [3, 2, 1, 0, 0]);
}

#[test]
fn describe_unknown_topic_fails() {
    Project::memory(ORDERS)
        .kr()
        .args(&["describe", "missing"])
        .fails()
        .code_is(1)
        .stderr_has("missing");
}

#[test]
fn offsets_at_timestamp() {
    let run = Project::memory(ORDERS).kr().args(&["offsets", "orders", "--at", "2", "-o", "json"]).passes();
    let offsets: Vec<_> = run.json_lines().iter().map(|o| o["offset"].as_i64().unwrap()).collect();
    assert_eq!(offsets, [2, 1, 1, 0, 0]);
}
