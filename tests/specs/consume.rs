// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kr consume`

use crate::prelude::*;
use crate::prelude::assert_eq;

fn offsets(run: &Run) -> Vec<(i64, i64)> {
    let mut offsets: Vec<_> = run
        .json_lines()
        .iter()
        .map(|r| (r["partition"].as_i64().unwrap(), r["offset"].as_i64().unwrap()))
        .collect();
    offsets.sort_unstable();
    offsets
}

#[test]
fn consume_reads_every_record_then_exits() {
    let run = Project::memory(ORDERS).kr().args(&["consume", "orders"]).passes();
    assert_eq!(offsets(&run), [(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (2, 0)]);
}

#[test]
fn consume_in_parallel_groups_reads_the_same_records() {
    let run = Project::memory(ORDERS)
        .kr()
        .args(&["consume", "orders", "--parallelism", "3", "--batch", "1"])
        .passes();
    assert_eq!(offsets(&run).len(), 6);
}

#[test]
fn consume_from_timestamp() {
    let run = Project::memory(ORDERS).kr().args(&["consume", "orders", "--from", "ts:2"]).passes();
    assert_eq!(offsets(&run), [(0, 2), (1, 1)]);
}

#[test]
fn consume_last_record_of_each_partition() {
    let run = Project::memory(ORDERS).kr().args(&["consume", "orders", "--from", "back:1"]).passes();
    assert_eq!(offsets(&run), [(0, 2), (1, 1), (2, 0)]);
}

#[test]
fn consume_from_latest_prints_nothing() {
    Project::memory(ORDERS)
        .kr()
        .args(&["consume", "orders", "--from", "latest"])
        .passes()
        .stdout_lacks("offset");
}

#[test]
fn filter_and_projection() {
    let run = Project::memory(ORDERS)
        .kr()
        .args(&["consume", "orders", "--filter", "/kind=paid", "--project", "/id"])
        .passes();
    let mut ids: Vec<_> = run.json_lines().iter().map(|r| r["value"].as_str().unwrap().to_string()).collect();
    ids.sort();
    assert_eq!(ids, ["2", "3"]);
}

#[test]
fn follow_with_limit_returns() {
    let run = Project::memory(ORDERS)
        .kr()
        .args(&["consume", "orders", "--follow", "--poll-timeout-ms", "10", "-n", "4"])
        .passes();
    assert_eq!(run.json_lines().len(), 4);
}

#[test]
fn progress_is_written_to_stderr() {
    Project::memory(ORDERS)
        .kr()
        .args(&["consume", "orders", "--progress"])
        .passes()
        .stderr_has("\"remaining\":0")
        .stdout_lacks("remaining");
}

#[test]
fn invalid_starting_point_is_rejected() {
    Project::memory(ORDERS)
        .kr()
        .args(&["consume", "orders", "--from", "yesterday"])
        .fails()
        .code_is(2)
        .stderr_has("ts:<ms>");
}

#[test]
fn invalid_filter_is_a_usage_error() {
    Project::memory(ORDERS)
        .kr()
        .args(&["consume", "orders", "--filter", "id>3"])
        .fails()
        .code_is(2)
        .stderr_has("invalid filter");
}

#[test]
fn unknown_topic_fails() {
    Project::memory(ORDERS).kr().args(&["consume", "nope"]).fails().code_is(1).stderr_has("nope");
}
