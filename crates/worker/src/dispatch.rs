// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named-function dispatch over a [`Broker`].

use std::sync::Arc;

use async_trait::async_trait;
use kr_core::{
    DescribeTopicRequest, FailureEnvelope, Function, FunctionHandler, ListTopicsRequest,
    ListTopicsResponse, PollConfig, ProduceRequest, QueryOffsetsRequest, QueryOffsetsResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::broker::Broker;
use crate::error::{BrokerError, FunctionError};

/// Decodes a call, runs it against the broker and encodes the response.
#[derive(Clone)]
pub struct Dispatcher {
    broker: Arc<dyn Broker>,
}

impl Dispatcher {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }

    pub async fn dispatch(&self, function: &str, payload: &str) -> Result<String, FunctionError> {
        let function: Function = function.parse()?;
        let name = function.to_string();
        let broker = &*self.broker;
        let failed = |source: BrokerError| FunctionError::Broker { function: name.clone(), source };

        match function {
            Function::ListTopics => {
                let request: ListTopicsRequest = decode(&name, payload)?;
                let topics = broker.list_topics(request.include_internal).await.map_err(failed)?;
                encode(&name, &ListTopicsResponse { topics })
            }
            Function::DescribeTopic => {
                let request: DescribeTopicRequest = decode(&name, payload)?;
                encode(&name, &broker.describe_topic(&request.topic).await.map_err(failed)?)
            }
            Function::QueryOffsets => {
                let request: QueryOffsetsRequest = decode(&name, payload)?;
                let offsets = broker.query_offsets(&request).await.map_err(failed)?;
                encode(&name, &QueryOffsetsResponse { offsets })
            }
            Function::Poll => {
                let config: PollConfig = decode(&name, payload)?;
                encode(&name, &broker.poll(&config).await.map_err(failed)?)
            }
            Function::Produce => {
                let request: ProduceRequest = decode(&name, payload)?;
                encode(&name, &broker.produce(&request).await.map_err(failed)?)
            }
        }
    }
}

#[async_trait]
impl FunctionHandler for Dispatcher {
    async fn handle(&self, function: &str, payload: &str) -> Result<String, FailureEnvelope> {
        match self.dispatch(function, payload).await {
            Ok(response) => {
                tracing::debug!(function, bytes = response.len(), "function completed");
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(function, error = %e, "function failed");
                Err(FailureEnvelope::from_error(e.type_tag(), &e))
            }
        }
    }
}

fn decode<T: DeserializeOwned>(function: &str, payload: &str) -> Result<T, FunctionError> {
    serde_json::from_str(payload)
        .map_err(|source| FunctionError::InvalidPayload { function: function.to_string(), source })
}

fn encode<T: Serialize>(function: &str, response: &T) -> Result<String, FunctionError> {
    serde_json::to_string(response)
        .map_err(|source| FunctionError::Encode { function: function.to_string(), source })
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
