// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to flush output and handle termination.

use std::fmt;

use kr_core::{RunnerError, RunnerErrorKind};

/// Any failure not classified below.
pub const EXIT_FAILURE: i32 = 1;
/// Bad arguments or configuration.
pub const EXIT_USAGE: i32 = 2;
/// A call exceeded its timeout.
pub const EXIT_TIMEOUT: i32 = 3;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, message)
    }
}

impl From<RunnerError> for ExitError {
    /// Renders the whole failure chain, outermost first.
    fn from(error: RunnerError) -> Self {
        let code = match error.kind {
            RunnerErrorKind::Argument => EXIT_USAGE,
            RunnerErrorKind::Timeout => EXIT_TIMEOUT,
            _ => EXIT_FAILURE,
        };
        let mut message = error.to_string();
        if let Some(error_type) = &error.error_type {
            message.push_str(&format!(" ({error_type})"));
        }
        for cause in error.chain().skip(1) {
            message.push_str("\n  caused by: ");
            message.push_str(&cause.message);
            if let Some(error_type) = &cause.error_type {
                message.push_str(&format!(" ({error_type})"));
            }
        }
        Self::new(code, message)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
