// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kr consume`: stream records as JSON lines

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use futures_util::StreamExt;
use kr_adapters::Runner;
use kr_core::{PartitionProgress, RunnerError};
use kr_engine::{JsonPointerQuery, ReadEvent, ReadRequest, StartingPoint, StopCondition};
use serde::Serialize;

use crate::exit_error::ExitError;
use crate::output::{is_closed_pipe, json_line};

#[derive(Debug, Clone, Args)]
pub struct ConsumeArgs {
    /// Topic to read
    pub topic: String,
    /// Starting point: earliest, latest, ts:<ms>, back:<n> or group:<id>
    #[arg(long, default_value = "earliest")]
    pub from: StartingPoint,
    /// Keep tailing after reaching the current end
    #[arg(long, short = 'f')]
    pub follow: bool,
    /// Concurrent read groups
    #[arg(long, default_value_t = 1)]
    pub parallelism: usize,
    /// Records per poll call
    #[arg(long, default_value_t = 500)]
    pub batch: usize,
    /// How long each poll waits for records
    #[arg(long, default_value_t = 1000)]
    pub poll_timeout_ms: u64,
    /// Record filter (repeatable, combined with AND):
    /// key=<text>, value~<text> or /<pointer>=<json>
    #[arg(long = "filter", value_name = "FILTER")]
    pub filters: Vec<String>,
    /// Replace each value by the field at this JSON pointer
    #[arg(long, value_name = "POINTER")]
    pub project: Option<String>,
    /// Stop after this many records
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
    /// Write progress snapshots to stderr as JSON lines
    #[arg(long)]
    pub progress: bool,
}

impl ConsumeArgs {
    pub fn request(&self) -> Result<ReadRequest, ExitError> {
        let query = JsonPointerQuery::parse(&self.filters, self.project.as_deref())
            .map_err(|e| ExitError::usage(e.to_string()))?;
        if self.parallelism == 0 {
            return Err(ExitError::usage("--parallelism must be at least 1"));
        }
        if self.batch == 0 {
            return Err(ExitError::usage("--batch must be at least 1"));
        }
        let stop = if self.follow { StopCondition::Continuously } else { StopCondition::AtCurrentEnd };
        Ok(ReadRequest::new(&self.topic)
            .starting_point(self.from.clone())
            .stop(stop)
            .parallelism(self.parallelism)
            .batch_size(self.batch)
            .poll_timeout(Duration::from_millis(self.poll_timeout_ms))
            .query(Arc::new(query)))
    }
}

#[derive(Serialize)]
struct ProgressLine<'a> {
    remaining: i64,
    progress: &'a [PartitionProgress],
}

/// Consume until the stream ends, the limit is reached, stdout closes or
/// Ctrl-C. Poll failures are reported after the remaining groups finish.
pub async fn run(
    runner: Arc<dyn Runner>,
    args: &ConsumeArgs,
    out: &mut dyn Write,
    progress_out: &mut dyn Write,
) -> Result<()> {
    let request = args.request()?;
    let mut stream = kr_engine::read(runner, request).await?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut emitted = 0usize;
    let mut failure: Option<RunnerError> = None;
    loop {
        if args.limit.is_some_and(|limit| emitted >= limit) {
            break;
        }
        let event = tokio::select! {
            event = stream.next() => event,
            _ = &mut ctrl_c => break,
        };
        let written = match event {
            None => break,
            Some(Ok(ReadEvent::Record(record))) => {
                emitted += 1;
                json_line(out, &record)
            }
            Some(Ok(ReadEvent::Progress(progress))) if args.progress => {
                let remaining = progress.iter().map(PartitionProgress::remaining).sum();
                json_line(progress_out, &ProgressLine { remaining, progress: &progress })
            }
            Some(Ok(ReadEvent::Progress(_))) => Ok(()),
            Some(Err(e)) => {
                tracing::error!(topic = %args.topic, error = %e, "read group failed");
                failure.get_or_insert(e);
                Ok(())
            }
        };
        match written {
            Err(e) if is_closed_pipe(&e) => break,
            other => other?,
        }
    }

    if let Err(e) = out.flush() {
        if !is_closed_pipe(&e) {
            return Err(e.into());
        }
    }
    tracing::debug!(topic = %args.topic, emitted, "consume finished");
    match failure {
        Some(e) => Err(ExitError::from(e).into()),
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "consume_tests.rs"]
mod tests;
