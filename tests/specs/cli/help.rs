// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Help and version output.

use crate::prelude::*;

#[test]
fn kr_no_args_shows_usage_and_exits_zero() {
    cli().passes().stdout_has("Usage:");
}

#[test]
fn kr_help_lists_commands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("topics")
        .stdout_has("describe")
        .stdout_has("offsets")
        .stdout_has("consume")
        .stdout_has("produce");
}

#[test]
fn consume_help_shows_read_flags() {
    cli()
        .args(&["consume", "--help"])
        .passes()
        .stdout_has("--from")
        .stdout_has("--follow")
        .stdout_has("--parallelism")
        .stdout_has("--filter")
        .stdout_has("--project");
}

#[test]
fn kr_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.2");
}

#[test]
fn unknown_runner_is_rejected_by_parser() {
    cli().args(&["--runner", "mainframe", "topics"]).fails().code_is(2);
}
