// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read sessions: describe, resolve the start, then run one poll loop per
//! partition group and merge their events.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, BoxStream, StreamExt};
use kr_adapters::{Runner, RunnerExt};
use kr_core::{
    DescribeTopicRequest, Function, PartitionProgress, PollConfig, PollResponse,
    QueryOffsetsRequest, QueryOffsetsResponse, Record, RunnerError, Subscription,
    TopicDescription,
};

use crate::grouping::partition_groups;
use crate::progress::ProgressAccumulator;
use crate::query::RecordQuery;
use crate::request::{ReadRequest, StartingPoint, StopCondition};
use crate::resume::ResumePositions;

/// Upper bound on group streams flowing at once.
pub const MERGE_CONCURRENCY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    Record(Record),
    /// Session-wide progress after a poll.
    Progress(Vec<PartitionProgress>),
}

pub type ReadStream = BoxStream<'static, Result<ReadEvent, RunnerError>>;

/// Start a read session.
///
/// Fails only if the topic cannot be described or the starting point cannot
/// be resolved. Poll failures surface as one `Err` item ending that group.
pub async fn read<R: Runner + ?Sized>(
    runner: Arc<R>,
    request: ReadRequest,
) -> Result<ReadStream, RunnerError> {
    let description: TopicDescription = runner
        .call(Function::DescribeTopic, &DescribeTopicRequest { topic: request.topic.clone() })
        .await?;
    let partitions: Vec<i32> = description.partitions.iter().map(|p| p.partition).collect();
    let start = resolve_start(&*runner, &request, &description).await?;

    // A consumer group distributes its own partitions.
    let parallelism = match start {
        Start::Group(_) => 1,
        Start::Offsets(_) => request.parallelism,
    };
    let groups = partition_groups(&partitions, parallelism);
    tracing::debug!(
        topic = %request.topic,
        from = %request.starting_point,
        partitions = partitions.len(),
        groups = groups.len(),
        "starting read"
    );

    let progress = ProgressAccumulator::new();
    let loops: Vec<ReadStream> = groups
        .into_iter()
        .map(|partitions| {
            GroupLoop {
                runner: Arc::clone(&runner),
                topic: request.topic.clone(),
                initial: start.subscription(&partitions),
                partitions,
                positions: ResumePositions::new(request.stop),
                stop: request.stop,
                batch_size: request.batch_size.max(1),
                poll_timeout: request.poll_timeout,
                query: Arc::clone(&request.query),
                progress: progress.clone(),
                done: false,
            }
            .into_stream()
        })
        .collect();

    Ok(stream::iter(loops).flatten_unordered(MERGE_CONCURRENCY).boxed())
}

/// Resolved starting point.
enum Start {
    Offsets(BTreeMap<i32, i64>),
    Group(String),
}

impl Start {
    fn subscription(&self, partitions: &[i32]) -> Subscription {
        match self {
            Self::Offsets(offsets) => Subscription::Assign {
                offsets: partitions
                    .iter()
                    .filter_map(|p| offsets.get(p).map(|&o| kr_core::PartitionOffset::new(*p, o)))
                    .collect(),
            },
            Self::Group(group_id) => Subscription::Group { group_id: group_id.clone() },
        }
    }
}

async fn resolve_start<R: Runner + ?Sized>(
    runner: &R,
    request: &ReadRequest,
    description: &TopicDescription,
) -> Result<Start, RunnerError> {
    let each = |f: &dyn Fn(i64, i64) -> i64| {
        Start::Offsets(
            description
                .partitions
                .iter()
                .map(|p| (p.partition, f(p.earliest_offset, p.latest_offset)))
                .collect(),
        )
    };
    Ok(match &request.starting_point {
        StartingPoint::Earliest => each(&|earliest, _| earliest),
        StartingPoint::Latest => each(&|_, latest| latest),
        StartingPoint::StepBack(n) => {
            let n = i64::try_from(*n).unwrap_or(i64::MAX);
            each(&|earliest, latest| latest.saturating_sub(n).max(earliest))
        }
        StartingPoint::Timestamp(timestamp) => {
            let response: QueryOffsetsResponse = runner
                .call(
                    Function::QueryOffsets,
                    &QueryOffsetsRequest {
                        topic: request.topic.clone(),
                        partitions: description.partitions.iter().map(|p| p.partition).collect(),
                        timestamp: *timestamp,
                    },
                )
                .await?;
            // Partitions the lookup left out have nothing at or after the
            // timestamp.
            let mut offsets: BTreeMap<i32, i64> =
                description.partitions.iter().map(|p| (p.partition, p.latest_offset)).collect();
            for o in response.offsets {
                if let Some(offset) = offsets.get_mut(&o.partition) {
                    *offset = o.offset;
                }
            }
            Start::Offsets(offsets)
        }
        StartingPoint::Group(group_id) => Start::Group(group_id.clone()),
    })
}

/// Poll loop of one partition group.
struct GroupLoop<R: ?Sized> {
    runner: Arc<R>,
    topic: String,
    partitions: Vec<i32>,
    initial: Subscription,
    positions: ResumePositions,
    stop: StopCondition,
    batch_size: usize,
    poll_timeout: Duration,
    query: Arc<dyn RecordQuery>,
    progress: ProgressAccumulator,
    done: bool,
}

impl<R: Runner + ?Sized> GroupLoop<R> {
    fn into_stream(self) -> ReadStream {
        stream::unfold(self, |mut group| async move {
            let events = group.step().await?;
            Some((stream::iter(events), group))
        })
        .flatten()
        .boxed()
    }

    /// One poll. `None` once the group has finished.
    async fn step(&mut self) -> Option<Vec<Result<ReadEvent, RunnerError>>> {
        if self.done {
            return None;
        }

        let subscription = if self.positions.is_empty() {
            self.initial.clone()
        } else {
            Subscription::Assign { offsets: self.positions.next_offsets() }
        };
        let config = PollConfig {
            topic: self.topic.clone(),
            subscription,
            max_records: self.batch_size,
            timeout_ms: self.poll_timeout.as_millis() as u64,
        };

        let response: PollResponse = match self.runner.call(Function::Poll, &config).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(topic = %self.topic, partitions = ?self.partitions, error = %e, "poll failed");
                self.done = true;
                return Some(vec![Err(e)]);
            }
        };

        self.positions.observe(&response.progress);
        let polled = response.records.len();
        let mut events = Vec::with_capacity(polled + 1);
        for record in response.records {
            if !self.positions.admits(record.partition, record.offset) {
                continue;
            }
            if let Some(record) = self.query.apply(record) {
                events.push(Ok(ReadEvent::Record(record)));
            }
        }
        let retired = self.positions.retire_exhausted();
        events.push(Ok(ReadEvent::Progress(self.progress.merge(&response.progress))));

        tracing::debug!(
            topic = %self.topic,
            partitions = ?self.partitions,
            polled,
            emitted = events.len() - 1,
            ?retired,
            "poll completed"
        );

        if self.stop == StopCondition::AtCurrentEnd && self.positions.is_empty() {
            tracing::debug!(topic = %self.topic, partitions = ?self.partitions, "read group reached end");
            self.done = true;
        }
        Some(events)
    }
}

#[cfg(test)]
#[path = "read_tests.rs"]
mod tests;
