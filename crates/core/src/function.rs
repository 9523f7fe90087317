// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker functions dispatched through runners, with their request and
//! response payloads.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::poll::PartitionOffset;

/// Named broker operations a runner can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Function {
    ListTopics,
    DescribeTopic,
    QueryOffsets,
    Poll,
    Produce,
}

crate::simple_display! {
    Function {
        ListTopics => "list_topics",
        DescribeTopic => "describe_topic",
        QueryOffsets => "query_offsets",
        Poll => "poll",
        Produce => "produce",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown function: {0}")]
pub struct UnknownFunction(pub String);

impl FromStr for Function {
    type Err = UnknownFunction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list_topics" => Ok(Self::ListTopics),
            "describe_topic" => Ok(Self::DescribeTopic),
            "query_offsets" => Ok(Self::QueryOffsets),
            "poll" => Ok(Self::Poll),
            "produce" => Ok(Self::Produce),
            other => Err(UnknownFunction(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTopicsRequest {
    /// Include internal topics (names starting with `__`).
    #[serde(default)]
    pub include_internal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub name: String,
    pub partitions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTopicsResponse {
    pub topics: Vec<TopicSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeTopicRequest {
    pub topic: String,
}

/// One partition with its log bounds at describe time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub partition: i32,
    pub earliest_offset: i64,
    /// High watermark: the offset the next produced record will get.
    pub latest_offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDescription {
    pub name: String,
    pub partitions: Vec<PartitionInfo>,
}

impl TopicDescription {
    pub fn partition(&self, partition: i32) -> Option<&PartitionInfo> {
        self.partitions.iter().find(|p| p.partition == partition)
    }
}

/// Look up, per partition, the first offset whose timestamp is `>= timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOffsetsRequest {
    pub topic: String,
    pub partitions: Vec<i32>,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOffsetsResponse {
    /// Partitions without a matching record report their latest offset.
    pub offsets: Vec<PartitionOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProduceRequest {
    pub topic: String,
    #[serde(default)]
    pub partition: Option<i32>,
    #[serde(default)]
    pub key: Option<String>,
    pub value: String,
    /// Milliseconds since the epoch; the broker assigns one when absent.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProduceResponse {
    pub partition: i32,
    pub offset: i64,
}

#[cfg(test)]
#[path = "function_tests.rs"]
mod tests;
