// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner contract
//!
//! A runner executes one named broker function with a JSON payload on some
//! worker and returns the function's JSON response, or a [`RunnerError`]
//! carrying the reconstructed remote failure chain.
//!
//! # Backends
//!
//! - [`local`] — bounded in-process worker pool
//! - [`serverless`] — synchronous remote function invocation
//! - [`k8s`] — one ephemeral pod per call, correlated through a watch stream

pub mod k8s;
pub mod local;
pub mod serverless;

use std::future::Future;
use std::time::Instant;

use async_trait::async_trait;
use kr_core::{Function, RunnerError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Executes named functions on a backend.
#[async_trait]
pub trait Runner: Send + Sync + 'static {
    /// Display name used to attribute errors (e.g. "kubernetes").
    fn name(&self) -> &str;

    /// Execute `function` with its JSON-encoded `payload`.
    async fn launch(&self, function: &str, payload: &str) -> Result<String, RunnerError>;

    /// Release backend resources. Calls still in flight fail.
    async fn shutdown(&self) {}
}

/// Typed calls on top of [`Runner::launch`].
pub trait RunnerExt: Runner {
    /// Serialize `request`, launch `function`, and parse the response.
    fn call<Req, Resp>(
        &self,
        function: Function,
        request: &Req,
    ) -> impl Future<Output = Result<Resp, RunnerError>> + Send
    where
        Req: Serialize + Sync + ?Sized,
        Resp: DeserializeOwned + Send;
}

impl<R: Runner + ?Sized> RunnerExt for R {
    fn call<Req, Resp>(
        &self,
        function: Function,
        request: &Req,
    ) -> impl Future<Output = Result<Resp, RunnerError>> + Send
    where
        Req: Serialize + Sync + ?Sized,
        Resp: DeserializeOwned + Send,
    {
        let payload = serde_json::to_string(request);
        async move {
            let payload = payload.map_err(|e| {
                RunnerError::argument(self.name(), format!("cannot encode {function} request: {e}"))
            })?;
            let start = Instant::now();
            let raw = self.launch(&function.to_string(), &payload).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &raw {
                Ok(_) => tracing::debug!(runner = self.name(), %function, elapsed_ms, "call completed"),
                Err(e) => tracing::debug!(runner = self.name(), %function, elapsed_ms, error = %e, "call failed"),
            }
            serde_json::from_str(&raw?).map_err(|e| {
                RunnerError::transport(
                    self.name(),
                    format!("unexpected {function} response: {e}"),
                )
            })
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
