// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kr_core::UnknownFunction;
use thiserror::Error;

/// Failure of one broker operation.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("unknown topic: {0}")]
    UnknownTopic(String),
    #[error("unknown partition {partition} of topic {topic}")]
    UnknownPartition { topic: String, partition: i32 },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid fixture: {0}")]
    Fixture(String),
    #[cfg(feature = "kafka")]
    #[error("kafka error")]
    Kafka(#[from] rdkafka::error::KafkaError),
    #[error("broker task failed: {0}")]
    Task(String),
}

/// Failure of one dispatched function call.
#[derive(Debug, Error)]
pub enum FunctionError {
    #[error(transparent)]
    UnknownFunction(#[from] UnknownFunction),
    #[error("invalid {function} payload")]
    InvalidPayload {
        function: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{function} failed")]
    Broker {
        function: String,
        #[source]
        source: BrokerError,
    },
    #[error("cannot encode {function} response")]
    Encode {
        function: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FunctionError {
    /// Type tag carried by the outermost failure envelope level.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::UnknownFunction(_) => "UnknownFunction",
            Self::InvalidPayload { .. } => "InvalidPayload",
            Self::Broker { .. } => "BrokerError",
            Self::Encode { .. } => "EncodeError",
        }
    }
}
