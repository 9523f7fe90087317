// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::query::{JsonPointerQuery, RecordQuery};

/// Where a read session starts on every partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartingPoint {
    Earliest,
    Latest,
    /// First record with timestamp `>=` this many milliseconds since the epoch.
    Timestamp(i64),
    /// The last `n` records of each partition.
    StepBack(u64),
    /// Committed positions of a consumer group.
    Group(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid starting point {0:?}: expected earliest, latest, ts:<ms>, back:<n> or group:<id>")]
pub struct StartingPointError(pub String);

impl FromStr for StartingPoint {
    type Err = StartingPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StartingPointError(s.to_string());
        match s.split_once(':') {
            None if s == "earliest" => Ok(Self::Earliest),
            None if s == "latest" => Ok(Self::Latest),
            Some(("ts", ms)) => ms.parse().map(Self::Timestamp).map_err(|_| invalid()),
            Some(("back", n)) => n.parse().map(Self::StepBack).map_err(|_| invalid()),
            Some(("group", id)) if !id.is_empty() => Ok(Self::Group(id.to_string())),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for StartingPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Earliest => f.write_str("earliest"),
            Self::Latest => f.write_str("latest"),
            Self::Timestamp(ms) => write!(f, "ts:{ms}"),
            Self::StepBack(n) => write!(f, "back:{n}"),
            Self::Group(id) => write!(f, "group:{id}"),
        }
    }
}

/// When a read session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopCondition {
    /// Stop once every partition reaches the end it had when first observed.
    #[default]
    AtCurrentEnd,
    /// Tail forever.
    Continuously,
}

/// One read session.
#[derive(Clone)]
pub struct ReadRequest {
    pub topic: String,
    pub starting_point: StartingPoint,
    pub stop: StopCondition,
    /// Requested number of concurrent read groups.
    pub parallelism: usize,
    /// Records per poll call.
    pub batch_size: usize,
    /// How long each poll call waits for records.
    pub poll_timeout: Duration,
    /// Filters and projection applied to every record.
    pub query: Arc<dyn RecordQuery>,
}

impl ReadRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            starting_point: StartingPoint::Earliest,
            stop: StopCondition::AtCurrentEnd,
            parallelism: 1,
            batch_size: 500,
            poll_timeout: Duration::from_secs(1),
            query: Arc::new(JsonPointerQuery::default()),
        }
    }

    kr_core::setters! {
        set {
            starting_point: StartingPoint,
            stop: StopCondition,
            parallelism: usize,
            batch_size: usize,
            poll_timeout: Duration,
            query: Arc<dyn RecordQuery>,
        }
    }
}

impl fmt::Debug for ReadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadRequest")
            .field("topic", &self.topic)
            .field("starting_point", &self.starting_point)
            .field("stop", &self.stop)
            .field("parallelism", &self.parallelism)
            .field("batch_size", &self.batch_size)
            .field("poll_timeout", &self.poll_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
