// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::VecDeque;

use super::*;
use crate::JsonPointerQuery;
use async_trait::async_trait;
use kr_adapters::LocalRunner;
use kr_core::{PartitionInfo, RunnerErrorKind};
use kr_worker::{Dispatcher, MemoryBroker};
use parking_lot::Mutex;

/// Five partitions, six records: p0 at timestamps 0/1/3, p1 at 1/2, p2 at 0,
/// p3 and p4 empty.
const FIXTURE: &str = r#"{"topics": [{"name": "orders", "partitions": [
    [{"timestamp": 0, "key": "a", "value": {"n": 0}},
     {"timestamp": 1, "key": "b", "value": {"n": 1}},
     {"timestamp": 3, "key": "c", "value": {"n": 2}}],
    [{"timestamp": 1, "key": "d", "value": {"n": 3}},
     {"timestamp": 2, "key": "e", "value": {"n": 4}}],
    [{"timestamp": 0, "key": "f", "value": {"n": 5}}],
    [],
    []
]}]}"#;

fn local_runner() -> Arc<LocalRunner> {
    let broker = MemoryBroker::from_json(FIXTURE).unwrap();
    Arc::new(LocalRunner::new(Arc::new(Dispatcher::new(Arc::new(broker))), 4))
}

async fn collect(runner: Arc<LocalRunner>, request: ReadRequest) -> (Vec<Record>, Vec<Vec<PartitionProgress>>) {
    let events: Vec<_> = read(runner, request).await.unwrap().collect().await;
    let mut records = Vec::new();
    let mut progress = Vec::new();
    for event in events {
        match event.unwrap() {
            ReadEvent::Record(r) => records.push(r),
            ReadEvent::Progress(p) => progress.push(p),
        }
    }
    (records, progress)
}

fn sorted_offsets(records: &[Record]) -> Vec<(i32, i64)> {
    let mut offsets: Vec<_> = records.iter().map(|r| (r.partition, r.offset)).collect();
    offsets.sort_unstable();
    offsets
}

#[tokio::test]
async fn earliest_reads_every_record_then_stops() {
    let (records, progress) = collect(local_runner(), ReadRequest::new("orders")).await;

    assert_eq!(records.len(), 6);
    assert!(!progress.is_empty());
    let last = progress.last().unwrap();
    assert_eq!(last.len(), 5);
    assert_eq!(last.iter().map(|p| p.records_count).sum::<u64>(), 6);
}

#[tokio::test]
async fn batching_and_parallelism_do_not_change_the_result() {
    for (parallelism, batch_size) in [(1, 500), (1, 2), (3, 1), (5, 2), (64, 500)] {
        let request = ReadRequest::new("orders").parallelism(parallelism).batch_size(batch_size);
        let (records, _) = collect(local_runner(), request).await;

        assert_eq!(
            sorted_offsets(&records),
            [(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (2, 0)],
            "parallelism {parallelism}, batch {batch_size}"
        );
    }
}

#[tokio::test]
async fn timestamp_start_reads_only_newer_records() {
    let request = ReadRequest::new("orders").starting_point(StartingPoint::Timestamp(2));
    let (records, _) = collect(local_runner(), request).await;

    assert_eq!(sorted_offsets(&records), [(0, 2), (1, 1)]);
    assert!(records.iter().all(|r| r.timestamp >= 2));
}

#[tokio::test]
async fn latest_start_reads_nothing_but_reports_progress() {
    let request = ReadRequest::new("orders").starting_point(StartingPoint::Latest);
    let (records, progress) = collect(local_runner(), request).await;

    assert!(records.is_empty());
    assert_eq!(progress.len(), 1);
}

#[tokio::test]
async fn step_back_reads_the_tail_of_each_partition() {
    let request = ReadRequest::new("orders").starting_point(StartingPoint::StepBack(1));
    let (records, _) = collect(local_runner(), request).await;
    assert_eq!(sorted_offsets(&records), [(0, 2), (1, 1), (2, 0)]);
}

#[tokio::test]
async fn group_start_resumes_from_commits_across_sessions() {
    let runner = local_runner();
    let request = ReadRequest::new("orders")
        .starting_point(StartingPoint::Group("audit".into()))
        .parallelism(4);

    let (first, _) = collect(Arc::clone(&runner), request.clone()).await;
    let (second, _) = collect(runner, request).await;

    assert_eq!(first.len(), 6);
    assert!(second.is_empty());
}

#[tokio::test]
async fn query_filters_and_projects_records() {
    let query = JsonPointerQuery::parse(&["value~\"n\":", "key=e"], Some("/n")).unwrap();
    let request = ReadRequest::new("orders").query(Arc::new(query));
    let (records, progress) = collect(local_runner(), request).await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value, "4");
    // Progress still counts what was polled.
    assert_eq!(progress.last().unwrap().iter().map(|p| p.records_count).sum::<u64>(), 6);
}

#[tokio::test]
async fn continuous_read_keeps_polling_after_the_end() {
    let request = ReadRequest::new("orders")
        .stop(StopCondition::Continuously)
        .poll_timeout(Duration::from_millis(5));
    let events: Vec<_> = read(local_runner(), request).await.unwrap().take(12).collect().await;

    assert_eq!(events.len(), 12);
    let records = events.iter().filter(|e| matches!(e, Ok(ReadEvent::Record(_)))).count();
    assert_eq!(records, 6);
    assert!(matches!(events.last(), Some(Ok(ReadEvent::Progress(_)))));
}

#[tokio::test]
async fn unknown_topic_fails_before_streaming() {
    let err = read(local_runner(), ReadRequest::new("missing")).await.err().unwrap();
    assert!(err.is(RunnerErrorKind::RemoteExecution));
}

/// Runner answering `describe_topic` from a fixed description and `poll`
/// from a script, recording every poll request.
struct ScriptedRunner {
    description: TopicDescription,
    polls: Mutex<VecDeque<Result<PollResponse, RunnerError>>>,
    requests: Mutex<Vec<PollConfig>>,
}

impl ScriptedRunner {
    fn new(latest: &[i64], polls: Vec<Result<PollResponse, RunnerError>>) -> Arc<Self> {
        let partitions = latest
            .iter()
            .enumerate()
            .map(|(p, &latest_offset)| PartitionInfo { partition: p as i32, earliest_offset: 0, latest_offset })
            .collect();
        Arc::new(Self {
            description: TopicDescription { name: "t".into(), partitions },
            polls: Mutex::new(polls.into()),
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Runner for ScriptedRunner {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn launch(&self, function: &str, payload: &str) -> Result<String, RunnerError> {
        match function {
            "describe_topic" => Ok(serde_json::to_string(&self.description).unwrap()),
            // Only partition 0 has a record at or after the timestamp.
            "query_offsets" => Ok(serde_json::to_string(&QueryOffsetsResponse {
                offsets: vec![kr_core::PartitionOffset::new(0, 1)],
            })
            .unwrap()),
            "poll" => {
                self.requests.lock().push(serde_json::from_str(payload).unwrap());
                let next = self.polls.lock().pop_front();
                match next {
                    Some(result) => result.map(|r| serde_json::to_string(&r).unwrap()),
                    None => std::future::pending().await,
                }
            }
            other => panic!("unexpected call {other}"),
        }
    }
}

fn record(partition: i32, offset: i64) -> Record {
    Record { topic: "t".into(), partition, offset, timestamp: offset, key: None, value: "v".into() }
}

fn progress(partition: i32, start: i64, current: i64, latest: i64, count: u64) -> PartitionProgress {
    PartitionProgress {
        topic: "t".into(),
        partition,
        earliest_offset: 0,
        latest_offset: latest,
        start_offset: start,
        current_offset: current,
        timestamp: None,
        records_count: count,
    }
}

#[tokio::test]
async fn later_polls_assign_after_the_last_delivered_offset() {
    let runner = ScriptedRunner::new(
        &[3],
        vec![
            Ok(PollResponse { records: vec![record(0, 0)], progress: vec![progress(0, 0, 0, 3, 1)] }),
            Ok(PollResponse {
                records: vec![record(0, 1), record(0, 2)],
                progress: vec![progress(0, 1, 2, 3, 2)],
            }),
        ],
    );

    let events: Vec<_> = read(Arc::clone(&runner), ReadRequest::new("t")).await.unwrap().collect().await;

    assert_eq!(events.iter().filter(|e| matches!(e, Ok(ReadEvent::Record(_)))).count(), 3);
    let requests = runner.requests.lock();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1].subscription,
        Subscription::Assign { offsets: vec![kr_core::PartitionOffset::new(0, 1)] }
    );
}

#[tokio::test]
async fn partitions_missing_from_the_timestamp_lookup_start_at_latest() {
    let runner = ScriptedRunner::new(
        &[3, 4],
        vec![Ok(PollResponse {
            records: vec![record(0, 1), record(0, 2)],
            progress: vec![progress(0, 1, 2, 3, 2), progress(1, 4, 3, 4, 0)],
        })],
    );

    let request = ReadRequest::new("t").starting_point(StartingPoint::Timestamp(10));
    let events: Vec<_> = read(Arc::clone(&runner), request).await.unwrap().collect().await;

    assert_eq!(events.iter().filter(|e| matches!(e, Ok(ReadEvent::Record(_)))).count(), 2);
    let requests = runner.requests.lock();
    assert_eq!(
        requests[0].subscription,
        Subscription::Assign {
            offsets: vec![kr_core::PartitionOffset::new(0, 1), kr_core::PartitionOffset::new(1, 4)]
        }
    );
}

#[tokio::test]
async fn records_produced_after_the_session_started_are_excluded() {
    // `until` is fixed at 2 by the first poll; the second poll sees a
    // watermark of 5 and delivers offsets 1..=3.
    let runner = ScriptedRunner::new(
        &[2],
        vec![
            Ok(PollResponse { records: vec![record(0, 0)], progress: vec![progress(0, 0, 0, 2, 1)] }),
            Ok(PollResponse {
                records: vec![record(0, 1), record(0, 2), record(0, 3)],
                progress: vec![progress(0, 1, 3, 5, 3)],
            }),
        ],
    );

    let events: Vec<_> = read(runner, ReadRequest::new("t")).await.unwrap().collect().await;
    let offsets: Vec<i64> = events
        .iter()
        .filter_map(|e| match e {
            Ok(ReadEvent::Record(r)) => Some(r.offset),
            _ => None,
        })
        .collect();
    assert_eq!(offsets, [0, 1]);
}

#[tokio::test]
async fn poll_failure_ends_the_group_with_one_error() {
    let runner = ScriptedRunner::new(
        &[3],
        vec![
            Ok(PollResponse { records: vec![record(0, 0)], progress: vec![progress(0, 0, 0, 3, 1)] }),
            Err(RunnerError::timeout("scripted", "poll took too long")),
        ],
    );

    let events: Vec<_> = read(runner, ReadRequest::new("t")).await.unwrap().collect().await;

    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], Ok(ReadEvent::Record(_))));
    assert!(matches!(events[1], Ok(ReadEvent::Progress(_))));
    assert!(events[2].as_ref().unwrap_err().is(RunnerErrorKind::Timeout));
}

#[tokio::test]
async fn failing_group_does_not_stop_the_others() {
    let runner = ScriptedRunner::new(
        &[1, 1],
        vec![
            Err(RunnerError::transport("scripted", "connection reset")),
            Ok(PollResponse { records: vec![record(1, 0)], progress: vec![progress(1, 0, 0, 1, 1)] }),
        ],
    );

    let events: Vec<_> =
        read(runner, ReadRequest::new("t").parallelism(2)).await.unwrap().collect().await;

    assert_eq!(events.iter().filter(|e| e.is_err()).count(), 1);
    assert_eq!(events.iter().filter(|e| matches!(e, Ok(ReadEvent::Record(_)))).count(), 1);
}
