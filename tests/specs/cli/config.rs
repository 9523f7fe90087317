// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration layering as seen from the command line.

use crate::prelude::*;

#[test]
fn missing_explicit_config_is_a_usage_error() {
    let project = Project::empty();
    project.kr().args(&["topics"]).fails().code_is(2).stderr_has("cannot read config");
}

#[test]
fn malformed_config_names_the_file() {
    let project = Project::empty();
    project.file("config.toml", "runner = [\n");
    project.kr().args(&["topics"]).fails().code_is(2).stderr_has("config.toml");
}

#[test]
fn environment_selects_the_memory_broker() {
    let project = Project::empty();
    project.file("topics.json", ORDERS);
    project.file("config.toml", "[local]\npool_size = 2\n");

    project
        .kr()
        .env("KR_BROKER", "memory")
        .env("KR_FIXTURE", project.path().join("topics.json"))
        .args(&["topics"])
        .passes()
        .stdout_has("orders");
}

#[test]
fn runner_flag_overrides_environment() {
    let project = Project::memory(ORDERS);
    project.kr().env("KR_RUNNER", "kubernetes").args(&["--runner", "local", "topics"]).passes();
}

#[test]
fn invalid_environment_value_is_reported() {
    let project = Project::memory(ORDERS);
    project
        .kr()
        .env("KR_TIMEOUT_MS", "soon")
        .args(&["topics"])
        .fails()
        .code_is(2)
        .stderr_has("KR_TIMEOUT_MS");
}
