// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kafka-backed [`Broker`] over `rdkafka`.
//!
//! Metadata, watermark and commit calls are blocking in librdkafka and run on
//! the blocking pool; record fetches use the async `StreamConsumer`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kr_core::{
    PartitionInfo, PartitionOffset, PartitionProgress, PollConfig, PollResponse, ProduceRequest,
    ProduceResponse, QueryOffsetsRequest, Record, Subscription, TopicDescription, TopicSummary,
};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, CommitMode, Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::{Message, Offset, TopicPartitionList};

use super::{Broker, INTERNAL_TOPIC_PREFIX};
use crate::error::BrokerError;

/// Group id used for explicit assignments, which never commit.
const ASSIGN_GROUP_ID: &str = "kr-worker";

pub struct KafkaBroker {
    config: ClientConfig,
    producer: FutureProducer,
    timeout: Duration,
}

impl KafkaBroker {
    pub fn new(bootstrap_servers: &str) -> Result<Self, BrokerError> {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", bootstrap_servers);
        let producer: FutureProducer =
            config.clone().set("message.timeout.ms", "10000").create()?;
        Ok(Self { config, producer, timeout: Duration::from_secs(10) })
    }

    /// Timeout for metadata, watermark and delivery requests.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn consumer_config(&self, group_id: &str) -> ClientConfig {
        let mut config = self.config.clone();
        config
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("enable.partition.eof", "false")
            .set("auto.offset.reset", "earliest");
        config
    }

    /// Run `f` on the blocking pool with a fresh metadata consumer.
    async fn blocking<T, F>(&self, f: F) -> Result<T, BrokerError>
    where
        T: Send + 'static,
        F: FnOnce(BaseConsumer, Duration) -> Result<T, BrokerError> + Send + 'static,
    {
        let consumer: BaseConsumer = self.consumer_config(ASSIGN_GROUP_ID).create()?;
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || f(consumer, timeout))
            .await
            .map_err(|e| BrokerError::Task(e.to_string()))?
    }
}

fn describe(
    consumer: &BaseConsumer,
    topic: &str,
    timeout: Duration,
) -> Result<TopicDescription, BrokerError> {
    let metadata = consumer.fetch_metadata(Some(topic), timeout)?;
    let found = metadata
        .topics()
        .iter()
        .find(|t| t.name() == topic && t.error().is_none() && !t.partitions().is_empty())
        .ok_or_else(|| BrokerError::UnknownTopic(topic.to_string()))?;

    let mut partitions = Vec::with_capacity(found.partitions().len());
    for p in found.partitions() {
        let (low, high) = consumer.fetch_watermarks(topic, p.id(), timeout)?;
        partitions.push(PartitionInfo { partition: p.id(), earliest_offset: low, latest_offset: high });
    }
    partitions.sort_by_key(|p| p.partition);
    Ok(TopicDescription { name: topic.to_string(), partitions })
}

#[async_trait]
impl Broker for KafkaBroker {
    async fn list_topics(&self, include_internal: bool) -> Result<Vec<TopicSummary>, BrokerError> {
        self.blocking(move |consumer, timeout| {
            let metadata = consumer.fetch_metadata(None, timeout)?;
            let mut topics: Vec<_> = metadata
                .topics()
                .iter()
                .filter(|t| include_internal || !t.name().starts_with(INTERNAL_TOPIC_PREFIX))
                .map(|t| TopicSummary { name: t.name().to_string(), partitions: t.partitions().len() })
                .collect();
            topics.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(topics)
        })
        .await
    }

    async fn describe_topic(&self, topic: &str) -> Result<TopicDescription, BrokerError> {
        let topic = topic.to_string();
        self.blocking(move |consumer, timeout| describe(&consumer, &topic, timeout)).await
    }

    async fn query_offsets(
        &self,
        request: &QueryOffsetsRequest,
    ) -> Result<Vec<PartitionOffset>, BrokerError> {
        let request = request.clone();
        self.blocking(move |consumer, timeout| {
            let description = describe(&consumer, &request.topic, timeout)?;
            let wanted: Vec<i32> = if request.partitions.is_empty() {
                description.partitions.iter().map(|p| p.partition).collect()
            } else {
                request.partitions.clone()
            };

            let mut tpl = TopicPartitionList::new();
            for &partition in &wanted {
                if description.partition(partition).is_none() {
                    return Err(BrokerError::UnknownPartition {
                        topic: request.topic.clone(),
                        partition,
                    });
                }
                tpl.add_partition_offset(&request.topic, partition, Offset::Offset(request.timestamp))?;
            }

            let resolved = consumer.offsets_for_times(tpl, timeout)?;
            Ok(resolved
                .elements()
                .iter()
                .map(|e| {
                    let latest = description.partition(e.partition()).map_or(0, |p| p.latest_offset);
                    let offset = match e.offset() {
                        Offset::Offset(o) if o >= 0 => o,
                        _ => latest,
                    };
                    PartitionOffset::new(e.partition(), offset)
                })
                .collect())
        })
        .await
    }

    async fn poll(&self, config: &PollConfig) -> Result<PollResponse, BrokerError> {
        let topic = config.topic.clone();
        let group_id = match &config.subscription {
            Subscription::Assign { .. } => ASSIGN_GROUP_ID,
            Subscription::Group { group_id } => group_id.as_str(),
        };
        let consumer: Arc<StreamConsumer> = Arc::new(self.consumer_config(group_id).create()?);

        // Offset each reported partition starts this poll at. Group members
        // start at the group's committed offset.
        let mut starts: BTreeMap<i32, i64> = BTreeMap::new();
        match &config.subscription {
            Subscription::Assign { offsets } => {
                let mut tpl = TopicPartitionList::new();
                for o in offsets {
                    tpl.add_partition_offset(&topic, o.partition, Offset::Offset(o.offset))?;
                    starts.insert(o.partition, o.offset);
                }
                consumer.assign(&tpl)?;
            }
            Subscription::Group { .. } => {
                let description = self.describe_topic(&topic).await?;
                let worker = Arc::clone(&consumer);
                let timeout = self.timeout;
                let committed_topic = topic.clone();
                let committed = tokio::task::spawn_blocking(move || {
                    let mut tpl = TopicPartitionList::new();
                    for p in &description.partitions {
                        tpl.add_partition(&committed_topic, p.partition);
                    }
                    let committed = worker.committed_offsets(tpl, timeout)?;
                    Ok::<_, BrokerError>(
                        description
                            .partitions
                            .iter()
                            .map(|p| {
                                let offset = committed
                                    .find_partition(&committed_topic, p.partition)
                                    .map_or(Offset::Invalid, |e| e.offset());
                                (p.partition, committed_start(offset, p.earliest_offset))
                            })
                            .collect::<BTreeMap<_, _>>(),
                    )
                })
                .await
                .map_err(|e| BrokerError::Task(e.to_string()))??;
                starts.extend(committed);
                consumer.subscribe(&[topic.as_str()])?;
            }
        }

        let deadline = tokio::time::Instant::now() + Duration::from_millis(config.timeout_ms);
        let max_records = config.max_records.max(1);
        let mut records = Vec::new();
        while records.len() < max_records {
            let message = match tokio::time::timeout_at(deadline, consumer.recv()).await {
                Ok(message) => message?,
                Err(_) => break,
            };
            records.push(Record {
                topic: message.topic().to_string(),
                partition: message.partition(),
                offset: message.offset(),
                timestamp: message.timestamp().to_millis().unwrap_or_default(),
                key: message.key().map(|k| String::from_utf8_lossy(k).into_owned()),
                value: message.payload().map(|v| String::from_utf8_lossy(v).into_owned()).unwrap_or_default(),
            });
        }

        let is_group = matches!(config.subscription, Subscription::Group { .. });
        let worker = Arc::clone(&consumer);
        let timeout = self.timeout;
        let partitions: Vec<i32> = starts.keys().copied().collect();
        let watermark_topic = topic.clone();
        let watermarks = tokio::task::spawn_blocking(move || {
            if is_group && !partitions.is_empty() {
                if let Err(e) = worker.commit_consumer_state(CommitMode::Sync) {
                    tracing::warn!(error = %e, "group commit failed");
                }
            }
            partitions
                .into_iter()
                .map(|p| Ok((p, worker.fetch_watermarks(&watermark_topic, p, timeout)?)))
                .collect::<Result<BTreeMap<_, _>, BrokerError>>()
        })
        .await
        .map_err(|e| BrokerError::Task(e.to_string()))??;

        let progress = starts
            .into_iter()
            .map(|(partition, start)| {
                let watermarks = watermarks.get(&partition).copied().unwrap_or((0, 0));
                let delivered: Vec<&Record> =
                    records.iter().filter(|r| r.partition == partition).collect();
                partition_progress(&topic, partition, start, watermarks, &delivered)
            })
            .collect();

        Ok(PollResponse { records, progress })
    }

    async fn produce(&self, request: &ProduceRequest) -> Result<ProduceResponse, BrokerError> {
        let mut record = FutureRecord::<str, str>::to(&request.topic).payload(&request.value);
        if let Some(key) = &request.key {
            record = record.key(key.as_str());
        }
        if let Some(partition) = request.partition {
            record = record.partition(partition);
        }
        if let Some(timestamp) = request.timestamp {
            record = record.timestamp(timestamp);
        }
        let (partition, offset) =
            self.producer.send(record, self.timeout).await.map_err(|(e, _)| e)?;
        Ok(ProduceResponse { partition, offset })
    }
}

/// Where a group member resumes a partition: the committed offset, or the
/// low watermark when the group has none (`auto.offset.reset=earliest`).
fn committed_start(committed: Offset, low: i64) -> i64 {
    match committed {
        Offset::Offset(o) if o >= 0 => o,
        _ => low,
    }
}

/// Progress for one partition of a poll that started at `start` and
/// delivered `delivered`, in offset order.
fn partition_progress(
    topic: &str,
    partition: i32,
    start: i64,
    (low, high): (i64, i64),
    delivered: &[&Record],
) -> PartitionProgress {
    let start = start.clamp(low, high.max(low));
    let last = delivered.last();
    PartitionProgress {
        topic: topic.to_string(),
        partition,
        earliest_offset: low,
        latest_offset: high,
        start_offset: start,
        current_offset: last.map_or(start - 1, |r| r.offset),
        timestamp: last.map(|r| r.timestamp),
        records_count: delivered.len() as u64,
    }
}

#[cfg(test)]
#[path = "kafka_tests.rs"]
mod tests;
