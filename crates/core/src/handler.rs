// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The function side of a call: whatever actually executes the broker
//! operation once a runner has delivered the envelope.

use async_trait::async_trait;

use crate::failure::FailureEnvelope;

/// Executes named functions against a JSON payload.
///
/// Implemented by the worker dispatcher; consumed directly by the local
/// runner and, through the worker binary, by the remote backends.
#[async_trait]
pub trait FunctionHandler: Send + Sync + 'static {
    /// Run `function` with its JSON-encoded `payload` and return the
    /// JSON-encoded response.
    async fn handle(&self, function: &str, payload: &str) -> Result<String, FailureEnvelope>;
}
