// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriber setup shared by the `kr` and `kr-worker` binaries.

use tracing_subscriber::EnvFilter;

/// Variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "KR_LOG";

/// Install a stderr `fmt` subscriber filtered by `KR_LOG`, then `RUST_LOG`,
/// defaulting to `warn`. Calling it twice is harmless.
pub fn init() {
    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
