// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container contract: run one envelope and leave its result in a file.
//!
//! The output file always holds either the function's JSON response or a
//! failure envelope; the process exit status says which.

use std::path::Path;

use kr_core::{CallEnvelope, FailureEnvelope, FunctionHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Succeeded => 0,
            Self::Failed => 1,
        }
    }
}

/// Decode `envelope`, dispatch it, and write the result to `output`.
pub async fn execute_envelope(
    handler: &dyn FunctionHandler,
    envelope: &str,
    output: &Path,
) -> std::io::Result<Outcome> {
    let (outcome, body) = match CallEnvelope::from_json(envelope) {
        Ok(call) => {
            tracing::info!(function = %call.function, "executing call");
            match handler.handle(&call.function, &call.payload).await {
                Ok(response) => (Outcome::Succeeded, response),
                Err(failure) => (Outcome::Failed, failure.to_json()),
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "malformed call envelope");
            (Outcome::Failed, FailureEnvelope::from_error("InvalidEnvelope", &e).to_json())
        }
    };

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    // Written under a temporary name first so a watcher never sees a
    // partial file.
    let partial = output.with_extension("partial");
    tokio::fs::write(&partial, body.as_bytes()).await?;
    tokio::fs::rename(&partial, output).await?;
    Ok(outcome)
}

#[cfg(test)]
#[path = "execute_tests.rs"]
mod tests;
