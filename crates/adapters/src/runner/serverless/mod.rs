// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serverless runner: one synchronous remote invocation per call.
//!
//! The request body is the call envelope. A successful invocation returns
//! the function's response unmodified; a failed one is signaled out-of-band
//! by the platform's error flag, in which case the body is a failure
//! envelope.

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(feature = "lambda")]
mod lambda;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeInvoker;
#[cfg(feature = "lambda")]
pub use lambda::LambdaInvoker;

use std::time::Duration;

use async_trait::async_trait;
use kr_core::{CallEnvelope, FailureEnvelope, RunnerError};
use thiserror::Error;

use super::Runner;

/// Failure of the invocation mechanism itself (network, throttling, auth).
#[derive(Debug, Error)]
#[error("invocation failed: {0}")]
pub struct InvokeError(pub String);

/// Raw result of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub payload: Vec<u8>,
    /// Out-of-band error marker (e.g. "Unhandled"); `None` on success.
    pub function_error: Option<String>,
}

/// Synchronous RPC to a deployed function.
#[async_trait]
pub trait FunctionInvoker: Send + Sync + 'static {
    async fn invoke(&self, function_name: &str, body: Vec<u8>) -> Result<Invocation, InvokeError>;
}

pub struct ServerlessRunner<I: FunctionInvoker> {
    invoker: I,
    /// Name of the deployed worker function.
    function_name: String,
    timeout: Duration,
}

impl<I: FunctionInvoker> ServerlessRunner<I> {
    pub const NAME: &'static str = "lambda";

    pub fn new(invoker: I, function_name: impl Into<String>) -> Self {
        Self { invoker, function_name: function_name.into(), timeout: Duration::from_secs(60) }
    }

    kr_core::setters! {
        set {
            timeout: Duration,
        }
    }
}

#[async_trait]
impl<I: FunctionInvoker> Runner for ServerlessRunner<I> {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn launch(&self, function: &str, payload: &str) -> Result<String, RunnerError> {
        let body = CallEnvelope::new(function, payload).to_json().into_bytes();
        let invocation =
            match tokio::time::timeout(self.timeout, self.invoker.invoke(&self.function_name, body))
                .await
            {
                Ok(Ok(invocation)) => invocation,
                Ok(Err(e)) => return Err(RunnerError::transport(Self::NAME, e.to_string())),
                Err(_) => {
                    return Err(RunnerError::timeout(
                        Self::NAME,
                        format!(
                            "{} ({function}) did not respond within {}ms",
                            self.function_name,
                            self.timeout.as_millis()
                        ),
                    ))
                }
            };

        let body = String::from_utf8(invocation.payload).map_err(|e| {
            RunnerError::transport(Self::NAME, format!("response is not UTF-8: {e}"))
        })?;

        match invocation.function_error {
            None => Ok(body),
            Some(marker) => match FailureEnvelope::parse(&body) {
                Some(envelope) => Err(envelope.into_runner_error(Self::NAME)),
                None => {
                    tracing::warn!(function, %marker, "function error without failure envelope");
                    Err(RunnerError::remote(Self::NAME, format!("{function} failed ({marker}): {body}"))
                        .error_type(marker))
                }
            },
        }
    }
}

#[cfg(test)]
#[path = "serverless_tests.rs"]
mod tests;
