// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process broker seeded from a JSON fixture.
//!
//! Fixture shape:
//!
//! ```json
//! {"topics": [{"name": "orders", "partitions": [
//!     [{"timestamp": 0, "key": "a", "value": "{\"id\":1}"}],
//!     []
//! ]}]}
//! ```
//!
//! Each inner array is one partition; offsets start at 0 in array order.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use kr_core::{
    PartitionInfo, PartitionOffset, PartitionProgress, PollConfig, PollResponse, ProduceRequest,
    ProduceResponse, QueryOffsetsRequest, Record, Subscription, TopicDescription, TopicSummary,
};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::Notify;

use super::{Broker, INTERNAL_TOPIC_PREFIX};
use crate::error::BrokerError;

#[derive(Debug, Clone, Deserialize)]
struct Fixture {
    topics: Vec<TopicFixture>,
}

/// One seeded topic.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicFixture {
    pub name: String,
    pub partitions: Vec<Vec<RecordFixture>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordFixture {
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub key: Option<String>,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone)]
struct Stored {
    timestamp: i64,
    key: Option<String>,
    value: String,
}

#[derive(Debug, Default)]
struct PartitionLog {
    records: Vec<Stored>,
}

impl PartitionLog {
    const EARLIEST: i64 = 0;

    fn latest(&self) -> i64 {
        Self::EARLIEST + self.records.len() as i64
    }

    fn clamp(&self, offset: i64) -> i64 {
        offset.clamp(Self::EARLIEST, self.latest())
    }

    fn from_offset(&self, offset: i64) -> impl Iterator<Item = (i64, &Stored)> {
        let skip = (offset - Self::EARLIEST).max(0) as usize;
        self.records.iter().enumerate().skip(skip).map(|(i, r)| (Self::EARLIEST + i as i64, r))
    }
}

#[derive(Default)]
struct State {
    topics: BTreeMap<String, Vec<PartitionLog>>,
    /// Committed next-offset per (group, topic, partition).
    commits: HashMap<(String, String, i32), i64>,
    round_robin: usize,
}

impl State {
    fn topic(&self, topic: &str) -> Result<&Vec<PartitionLog>, BrokerError> {
        self.topics.get(topic).ok_or_else(|| BrokerError::UnknownTopic(topic.to_string()))
    }

    fn partition(&self, topic: &str, partition: i32) -> Result<&PartitionLog, BrokerError> {
        usize::try_from(partition)
            .ok()
            .and_then(|p| self.topic(topic).ok()?.get(p))
            .ok_or_else(|| unknown_partition(topic, partition))
    }
}

fn unknown_partition(topic: &str, partition: i32) -> BrokerError {
    BrokerError::UnknownPartition { topic: topic.to_string(), partition }
}

/// [`Broker`] holding every topic in memory.
#[derive(Default)]
pub struct MemoryBroker {
    state: Mutex<State>,
    produced: Notify,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixtures(topics: Vec<TopicFixture>) -> Self {
        let broker = Self::new();
        {
            let mut state = broker.state.lock();
            for topic in topics {
                let partitions = topic
                    .partitions
                    .into_iter()
                    .map(|records| PartitionLog {
                        records: records
                            .into_iter()
                            .map(|r| Stored {
                                timestamp: r.timestamp,
                                key: r.key,
                                value: match r.value {
                                    serde_json::Value::String(s) => s,
                                    other => other.to_string(),
                                },
                            })
                            .collect(),
                    })
                    .collect();
                state.topics.insert(topic.name, partitions);
            }
        }
        broker
    }

    pub fn from_json(raw: &str) -> Result<Self, BrokerError> {
        let fixture: Fixture =
            serde_json::from_str(raw).map_err(|e| BrokerError::Fixture(e.to_string()))?;
        Ok(Self::from_fixtures(fixture.topics))
    }

    pub fn from_path(path: &Path) -> Result<Self, BrokerError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BrokerError::Fixture(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Create an empty topic. Existing topics are left unchanged.
    pub fn create_topic(&self, name: &str, partitions: usize) {
        self.state
            .lock()
            .topics
            .entry(name.to_string())
            .or_insert_with(|| (0..partitions.max(1)).map(|_| PartitionLog::default()).collect());
    }

    /// Committed next-offset of `group_id` on one partition.
    pub fn committed(&self, group_id: &str, topic: &str, partition: i32) -> Option<i64> {
        self.state
            .lock()
            .commits
            .get(&(group_id.to_string(), topic.to_string(), partition))
            .copied()
    }

    fn read(&self, config: &PollConfig) -> Result<PollResponse, BrokerError> {
        let mut state = self.state.lock();
        let topic = config.topic.as_str();
        let logs = state.topic(topic)?;

        let starts: Vec<(i32, i64)> = match &config.subscription {
            Subscription::Assign { offsets } => offsets
                .iter()
                .map(|o| Ok((o.partition, state.partition(topic, o.partition)?.clamp(o.offset))))
                .collect::<Result<_, BrokerError>>()?,
            Subscription::Group { group_id } => (0..logs.len() as i32)
                .map(|p| {
                    let committed = state
                        .commits
                        .get(&(group_id.clone(), topic.to_string(), p))
                        .copied()
                        .unwrap_or(PartitionLog::EARLIEST);
                    Ok((p, state.partition(topic, p)?.clamp(committed)))
                })
                .collect::<Result<_, BrokerError>>()?,
        };

        let mut budget = config.max_records.max(1);
        let mut response = PollResponse::default();
        let mut commits = Vec::new();
        for (partition, start) in starts {
            let log = state.partition(topic, partition)?;
            let mut current = start - 1;
            let mut timestamp = None;
            let mut count = 0u64;
            for (offset, stored) in log.from_offset(start).take(budget) {
                response.records.push(Record {
                    topic: topic.to_string(),
                    partition,
                    offset,
                    timestamp: stored.timestamp,
                    key: stored.key.clone(),
                    value: stored.value.clone(),
                });
                current = offset;
                timestamp = Some(stored.timestamp);
                count += 1;
            }
            budget -= count as usize;
            response.progress.push(PartitionProgress {
                topic: topic.to_string(),
                partition,
                earliest_offset: PartitionLog::EARLIEST,
                latest_offset: log.latest(),
                start_offset: start,
                current_offset: current,
                timestamp,
                records_count: count,
            });
            commits.push((partition, current + 1));
        }

        if let Subscription::Group { group_id } = &config.subscription {
            for (partition, next) in commits {
                state.commits.insert((group_id.clone(), topic.to_string(), partition), next);
            }
        }
        Ok(response)
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn list_topics(&self, include_internal: bool) -> Result<Vec<TopicSummary>, BrokerError> {
        Ok(self
            .state
            .lock()
            .topics
            .iter()
            .filter(|(name, _)| include_internal || !name.starts_with(INTERNAL_TOPIC_PREFIX))
            .map(|(name, partitions)| TopicSummary { name: name.clone(), partitions: partitions.len() })
            .collect())
    }

    async fn describe_topic(&self, topic: &str) -> Result<TopicDescription, BrokerError> {
        let state = self.state.lock();
        let partitions = state
            .topic(topic)?
            .iter()
            .enumerate()
            .map(|(p, log)| PartitionInfo {
                partition: p as i32,
                earliest_offset: PartitionLog::EARLIEST,
                latest_offset: log.latest(),
            })
            .collect();
        Ok(TopicDescription { name: topic.to_string(), partitions })
    }

    async fn query_offsets(
        &self,
        request: &QueryOffsetsRequest,
    ) -> Result<Vec<PartitionOffset>, BrokerError> {
        let state = self.state.lock();
        let topic = request.topic.as_str();
        let partitions: Vec<i32> = if request.partitions.is_empty() {
            (0..state.topic(topic)?.len() as i32).collect()
        } else {
            request.partitions.clone()
        };

        partitions
            .into_iter()
            .map(|partition| {
                let log = state.partition(topic, partition)?;
                let offset = log
                    .from_offset(PartitionLog::EARLIEST)
                    .find(|(_, r)| r.timestamp >= request.timestamp)
                    .map_or(log.latest(), |(offset, _)| offset);
                Ok(PartitionOffset::new(partition, offset))
            })
            .collect()
    }

    async fn poll(&self, config: &PollConfig) -> Result<PollResponse, BrokerError> {
        let produced = self.produced.notified();
        let response = self.read(config)?;
        if !response.records.is_empty() || config.timeout_ms == 0 {
            return Ok(response);
        }
        // Nothing available: wait for a produce, up to the poll timeout.
        match tokio::time::timeout(Duration::from_millis(config.timeout_ms), produced).await {
            Ok(()) => self.read(config),
            Err(_) => Ok(response),
        }
    }

    async fn produce(&self, request: &ProduceRequest) -> Result<ProduceResponse, BrokerError> {
        let response = {
            let mut state = self.state.lock();
            let count = state.topic(&request.topic)?.len();
            if count == 0 {
                return Err(BrokerError::InvalidRequest(format!(
                    "topic {} has no partitions",
                    request.topic
                )));
            }
            let partition = match (request.partition, &request.key) {
                (Some(p), _) => {
                    state.partition(&request.topic, p)?;
                    p
                }
                (None, Some(key)) => {
                    let mut hasher = DefaultHasher::new();
                    key.hash(&mut hasher);
                    (hasher.finish() % count as u64) as i32
                }
                (None, None) => {
                    state.round_robin = state.round_robin.wrapping_add(1);
                    (state.round_robin % count) as i32
                }
            };
            let timestamp = request.timestamp.unwrap_or_else(now_millis);
            let log = state
                .topics
                .get_mut(&request.topic)
                .and_then(|t| t.get_mut(partition as usize))
                .ok_or_else(|| unknown_partition(&request.topic, partition))?;
            let offset = log.latest();
            log.records.push(Stored {
                timestamp,
                key: request.key.clone(),
                value: request.value.clone(),
            });
            ProduceResponse { partition, offset }
        };
        self.produced.notify_waiters();
        Ok(response)
    }
}

fn now_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis() as i64)
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
