// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted invoker for tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{FunctionInvoker, InvokeError, Invocation};

/// Replays queued invocation results and records request bodies.
///
/// When the queue is empty, `invoke` never returns.
#[derive(Clone, Default)]
pub struct FakeInvoker {
    responses: Arc<Mutex<VecDeque<Result<Invocation, InvokeError>>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, payload: &str) -> &Self {
        self.responses
            .lock()
            .push_back(Ok(Invocation { payload: payload.as_bytes().to_vec(), function_error: None }));
        self
    }

    pub fn fail(&self, marker: &str, payload: &str) -> &Self {
        self.responses.lock().push_back(Ok(Invocation {
            payload: payload.as_bytes().to_vec(),
            function_error: Some(marker.to_string()),
        }));
        self
    }

    pub fn error(&self, message: &str) -> &Self {
        self.responses.lock().push_back(Err(InvokeError(message.to_string())));
        self
    }

    /// `(function_name, body)` of every invocation so far.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl FunctionInvoker for FakeInvoker {
    async fn invoke(&self, function_name: &str, body: Vec<u8>) -> Result<Invocation, InvokeError> {
        self.requests
            .lock()
            .push((function_name.to_string(), String::from_utf8_lossy(&body).into_owned()));
        let next = self.responses.lock().pop_front();
        match next {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}
