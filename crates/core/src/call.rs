// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Call envelope: the wire shape of one remote function call.
//!
//! Every backend receives the same envelope, `{"function": <name>,
//! "payload": <JSON-encoded string>}`, in its native invocation shape:
//! an RPC request body for serverless, positional container arguments for
//! the orchestrated backend, a direct in-process dispatch for the local pool.

use serde::{Deserialize, Serialize};

/// One remote invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEnvelope {
    pub function: String,
    /// Opaque, already JSON-encoded request for `function`.
    pub payload: String,
}

impl CallEnvelope {
    pub fn new(function: impl Into<String>, payload: impl Into<String>) -> Self {
        Self { function: function.into(), payload: payload.into() }
    }

    /// Serialize to the request body / container argument form.
    pub fn to_json(&self) -> String {
        serde_json::json!({ "function": self.function, "payload": self.payload }).to_string()
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Positional arguments for the primary container of an execution unit:
    /// the serialized envelope followed by the absolute output-file path.
    pub fn container_args(&self, output_path: &str) -> Vec<String> {
        vec![self.to_json(), output_path.to_string()]
    }
}

#[cfg(test)]
#[path = "call_tests.rs"]
mod tests;
