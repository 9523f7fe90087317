// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kr-engine: resumable, partition-parallel reads over a [`Runner`]
//!
//! [`read`] turns bounded `poll` calls into one stream of [`ReadEvent`]s.
//! Partitions are split into independent read groups; each group tracks a
//! [`ResumePosition`] per partition and stops according to the session's
//! [`StopCondition`].
//!
//! [`Runner`]: kr_adapters::Runner

mod grouping;
mod progress;
mod query;
mod read;
mod request;
mod resume;

pub use grouping::partition_groups;
pub use progress::ProgressAccumulator;
pub use query::{Filter, JsonPointerQuery, QueryError, RecordQuery};
pub use read::{read, ReadEvent, ReadStream, MERGE_CONCURRENCY};
pub use request::{ReadRequest, StartingPoint, StartingPointError, StopCondition};
pub use resume::{ResumePosition, ResumePositions};
