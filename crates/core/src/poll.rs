// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Poll call payloads: where to read, what came back, and how far along
//! each partition is.
//!
//! Offsets follow the broker convention: `latest_offset` is the high
//! watermark (next offset to be written), and `current_offset` is the
//! offset of the last record delivered, or `start_offset - 1` when nothing
//! has been delivered yet. A partition is exhausted once
//! `current_offset == latest_offset - 1`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionOffset {
    pub partition: i32,
    pub offset: i64,
}

impl PartitionOffset {
    pub fn new(partition: i32, offset: i64) -> Self {
        Self { partition, offset }
    }
}

/// Where a poll starts reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Subscription {
    /// Read the listed partitions from explicit offsets.
    Assign { offsets: Vec<PartitionOffset> },
    /// Join a consumer group and read from its committed positions.
    Group { group_id: String },
}

/// One bounded poll call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    pub topic: String,
    pub subscription: Subscription,
    /// Upper bound on records returned by this call.
    pub max_records: usize,
    /// How long the function waits for records before returning.
    pub timeout_ms: u64,
}

/// A decoded record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub key: Option<String>,
    /// Formatted value.
    pub value: String,
}

/// Read progress of one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionProgress {
    pub topic: String,
    pub partition: i32,
    pub earliest_offset: i64,
    pub latest_offset: i64,
    /// Offset the read started at.
    pub start_offset: i64,
    /// Offset of the last delivered record (`start_offset - 1` before any).
    pub current_offset: i64,
    /// Timestamp of the last delivered record.
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub records_count: u64,
}

impl PartitionProgress {
    /// Merge a newer observation of the same partition into `self`.
    ///
    /// Record counts accumulate, offsets and bounds take the newer values,
    /// the timestamp is kept when the newer poll delivered nothing, and the
    /// original start offset is preserved.
    pub fn merge(&mut self, newer: &PartitionProgress) {
        self.earliest_offset = newer.earliest_offset;
        self.latest_offset = newer.latest_offset;
        self.current_offset = self.current_offset.max(newer.current_offset);
        if newer.timestamp.is_some() {
            self.timestamp = newer.timestamp;
        }
        self.records_count += newer.records_count;
    }

    /// Records left before the high watermark.
    pub fn remaining(&self) -> i64 {
        (self.latest_offset - 1 - self.current_offset).max(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResponse {
    pub records: Vec<Record>,
    /// One entry per partition the poll was assigned.
    pub progress: Vec<PartitionProgress>,
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
