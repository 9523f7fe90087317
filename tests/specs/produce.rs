// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kr produce`

use crate::prelude::*;
use crate::prelude::assert_eq;

#[test]
fn produce_appends_after_the_fixture() {
    Project::memory(ORDERS)
        .kr()
        .args(&["produce", "orders", "{\"id\":7}", "--partition", "0"])
        .passes()
        .stdout_has("orders partition 0 offset 3");
}

#[test]
fn produce_reads_stdin_lines() {
    let run = Project::memory(ORDERS)
        .kr()
        .args(&["produce", "orders", "--partition", "3", "-o", "json"])
        .stdin("one\ntwo\nthree\n")
        .passes();
    let offsets: Vec<_> = run.json_lines().iter().map(|r| r["offset"].as_i64().unwrap()).collect();
    assert_eq!(offsets, [0, 1, 2]);
}

#[test]
fn produce_to_missing_partition_fails() {
    Project::memory(ORDERS)
        .kr()
        .args(&["produce", "orders", "x", "--partition", "9"])
        .fails()
        .code_is(1);
}
