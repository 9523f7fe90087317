// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker access from inside a worker.

#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory;

use async_trait::async_trait;
use kr_core::{
    PartitionOffset, PollConfig, PollResponse, ProduceRequest, ProduceResponse,
    QueryOffsetsRequest, TopicDescription, TopicSummary,
};

use crate::error::BrokerError;

/// Topics whose names start with this are internal to the broker.
pub const INTERNAL_TOPIC_PREFIX: &str = "__";

/// The broker operations behind the named functions.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    async fn list_topics(&self, include_internal: bool) -> Result<Vec<TopicSummary>, BrokerError>;

    async fn describe_topic(&self, topic: &str) -> Result<TopicDescription, BrokerError>;

    /// First offset per partition with timestamp `>= request.timestamp`, or
    /// the latest offset when there is none. An empty partition list means
    /// every partition of the topic.
    async fn query_offsets(
        &self,
        request: &QueryOffsetsRequest,
    ) -> Result<Vec<PartitionOffset>, BrokerError>;

    /// One bounded read. Progress is reported for every partition the poll
    /// was assigned, including those that delivered nothing.
    async fn poll(&self, config: &PollConfig) -> Result<PollResponse, BrokerError>;

    async fn produce(&self, request: &ProduceRequest) -> Result<ProduceResponse, BrokerError>;
}
