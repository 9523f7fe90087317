// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local runner: dispatches calls in-process on a bounded worker pool.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kr_core::{FunctionHandler, RunnerError};
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;

use super::Runner;

/// Runs calls on tokio tasks, at most `pool_size` at a time.
///
/// Handler failures (and panics) surface as a single-level
/// `RemoteExecution` error; there is no remote stack trace to preserve.
#[derive(Clone)]
pub struct LocalRunner {
    handler: Arc<dyn FunctionHandler>,
    pool: Arc<Semaphore>,
    timeout: Duration,
}

impl LocalRunner {
    pub const NAME: &'static str = "local";

    pub fn new(handler: Arc<dyn FunctionHandler>, pool_size: usize) -> Self {
        Self {
            handler,
            pool: Arc::new(Semaphore::new(pool_size.max(1))),
            timeout: Duration::from_secs(60),
        }
    }

    kr_core::setters! {
        set {
            timeout: Duration,
        }
    }
}

/// Aborts the handler task when the launch is dropped or times out.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[async_trait]
impl Runner for LocalRunner {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn launch(&self, function: &str, payload: &str) -> Result<String, RunnerError> {
        let permit = Arc::clone(&self.pool)
            .acquire_owned()
            .await
            .map_err(|_| RunnerError::transport(Self::NAME, "worker pool closed"))?;

        let handler = Arc::clone(&self.handler);
        let function_name = function.to_string();
        let payload = payload.to_string();
        let task = tokio::spawn(async move {
            let _permit = permit;
            handler.handle(&function_name, &payload).await
        });
        let _abort = AbortOnDrop(task.abort_handle());

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(response))) => Ok(response),
            Ok(Ok(Err(failure))) => {
                let mut error = RunnerError::remote(Self::NAME, failure.error_message);
                if !failure.error_type.is_empty() {
                    error = error.error_type(failure.error_type);
                }
                Err(error)
            }
            Ok(Err(join_error)) => Err(RunnerError::remote(
                Self::NAME,
                format!("{function} dispatch failed: {join_error}"),
            )),
            Err(_) => Err(RunnerError::timeout(
                Self::NAME,
                format!("{function} did not complete within {}ms", self.timeout.as_millis()),
            )),
        }
    }

    async fn shutdown(&self) {
        self.pool.close();
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
