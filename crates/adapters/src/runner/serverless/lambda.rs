// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AWS Lambda invoker.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;

use super::{FunctionInvoker, InvokeError, Invocation};

/// Invokes the worker function with `RequestResponse` semantics.
///
/// Creating a Lambda client loads the AWS config chain, so build one and
/// reuse it across calls.
#[derive(Clone)]
pub struct LambdaInvoker {
    client: aws_sdk_lambda::Client,
}

impl LambdaInvoker {
    /// Create a client from the default AWS config chain.
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self { client: aws_sdk_lambda::Client::new(&sdk_config) }
    }

    pub fn with_client(client: aws_sdk_lambda::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FunctionInvoker for LambdaInvoker {
    async fn invoke(&self, function_name: &str, body: Vec<u8>) -> Result<Invocation, InvokeError> {
        let output = self
            .client
            .invoke()
            .function_name(function_name)
            .invocation_type(InvocationType::RequestResponse)
            .payload(Blob::new(body))
            .send()
            .await
            .map_err(|e| InvokeError(DisplayErrorContext(&e).to_string()))?;

        Ok(Invocation {
            payload: output.payload().map(|b| b.as_ref().to_vec()).unwrap_or_default(),
            function_error: output.function_error().map(str::to_string),
        })
    }
}
