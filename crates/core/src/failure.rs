// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure model shared by every runner.
//!
//! A remote failure travels as a [`FailureEnvelope`]:
//!
//! ```text
//! {"errorMessage": "...", "errorType": "...", "stackTrace": ["..."], "cause": {...} | null}
//! ```
//!
//! and is reconstructed locally as a chain of [`RunnerError`]s, one level per
//! envelope, so callers see one error shape regardless of backend.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error taxonomy surfaced by runners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerErrorKind {
    /// The execution unit could not even start (image, scheduling).
    Infra,
    /// The remote call ran and failed.
    RemoteExecution,
    /// The client gave up waiting.
    Timeout,
    /// The invocation mechanism itself failed (network, serialization).
    Transport,
    /// Invalid topic/partition/config, detected before dispatch.
    Argument,
}

crate::simple_display! {
    RunnerErrorKind {
        Infra => "infra",
        RemoteExecution => "remote execution",
        Timeout => "timeout",
        Transport => "transport",
        Argument => "argument",
    }
}

/// Local representation of a remote (or dispatch) failure.
#[derive(Debug, Clone, Error)]
#[error("[{runner}] {kind} error: {message}")]
pub struct RunnerError {
    pub kind: RunnerErrorKind,
    /// Display name of the runner that produced the error.
    pub runner: String,
    pub message: String,
    /// Remote type tag, when the failure came from an envelope.
    pub error_type: Option<String>,
    /// Remote stack trace lines (empty when unavailable).
    pub stack_trace: Vec<String>,
    #[source]
    pub cause: Option<Box<RunnerError>>,
}

impl RunnerError {
    pub fn new(kind: RunnerErrorKind, runner: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            runner: runner.into(),
            message: message.into(),
            error_type: None,
            stack_trace: Vec::new(),
            cause: None,
        }
    }

    pub fn infra(runner: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(RunnerErrorKind::Infra, runner, message)
    }

    pub fn remote(runner: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(RunnerErrorKind::RemoteExecution, runner, message)
    }

    pub fn timeout(runner: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(RunnerErrorKind::Timeout, runner, message)
    }

    pub fn transport(runner: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(RunnerErrorKind::Transport, runner, message)
    }

    pub fn argument(runner: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(RunnerErrorKind::Argument, runner, message)
    }

    crate::setters! {
        set {
            stack_trace: Vec<String>,
        }
        option {
            error_type: String,
            cause: Box<RunnerError>,
        }
    }

    /// This error followed by each nested cause, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &RunnerError> {
        std::iter::successors(Some(self), |e| e.cause.as_deref())
    }

    /// Number of levels in the cause chain (1 for an error without cause).
    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    /// Kind of the outermost level.
    pub fn is(&self, kind: RunnerErrorKind) -> bool {
        self.kind == kind
    }
}

/// Structured, possibly nested, JSON representation of a remote failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEnvelope {
    pub error_message: String,
    #[serde(default)]
    pub error_type: String,
    #[serde(default)]
    pub stack_trace: Vec<String>,
    #[serde(default)]
    pub cause: Option<Box<FailureEnvelope>>,
}

impl FailureEnvelope {
    pub fn new(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
            error_type: error_type.into(),
            stack_trace: Vec::new(),
            cause: None,
        }
    }

    crate::setters! {
        set {
            stack_trace: Vec<String>,
        }
        option {
            cause: Box<FailureEnvelope>,
        }
    }

    /// Parse a raw response body as a failure envelope.
    ///
    /// Returns `None` for anything that is not an envelope; callers degrade
    /// to a generic failure carrying the raw status.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw.trim()).ok()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            serde_json::json!({ "errorMessage": self.error_message }).to_string()
        })
    }

    /// Build an envelope from a Rust error, one level per `source()`.
    ///
    /// The outermost level carries `error_type`; nested levels are tagged
    /// `"cause"`.
    pub fn from_error(
        error_type: impl Into<String>,
        error: &(dyn std::error::Error + 'static),
    ) -> Self {
        let causes: Vec<String> =
            std::iter::successors(error.source(), |e| e.source()).map(|e| e.to_string()).collect();
        let cause = causes.into_iter().rev().fold(None, |inner: Option<Box<Self>>, message| {
            Some(Box::new(Self { cause: inner, ..Self::new("cause", message) }))
        });
        Self { cause, ..Self::new(error_type, error.to_string()) }
    }

    /// Number of levels in the envelope (1 without cause).
    pub fn depth(&self) -> usize {
        std::iter::successors(Some(self), |e| e.cause.as_deref()).count()
    }

    /// Reconstruct the envelope as a [`RunnerError`] chain.
    ///
    /// Every level becomes a `RemoteExecution` error attributed to `runner`,
    /// preserving message, type tag and stack trace.
    pub fn into_runner_error(self, runner: &str) -> RunnerError {
        let FailureEnvelope { error_message, error_type, stack_trace, cause } = self;
        let mut error = RunnerError::remote(runner, error_message).stack_trace(stack_trace);
        if !error_type.is_empty() {
            error = error.error_type(error_type);
        }
        match cause {
            Some(cause) => error.cause(cause.into_runner_error(runner)),
            None => error,
        }
    }
}

#[cfg(test)]
#[path = "failure_tests.rs"]
mod tests;
