// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-partition continuation state of one read group.

use std::collections::{BTreeMap, BTreeSet};

use kr_core::{PartitionOffset, PartitionProgress};

use crate::request::StopCondition;

/// Where a partition continues and where it stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePosition {
    /// Last delivered offset (`start - 1` before any).
    pub current: i64,
    /// High watermark at first observation; fixed for the session.
    pub until: i64,
}

impl ResumePosition {
    pub fn is_exhausted(&self) -> bool {
        self.current >= self.until - 1
    }
}

/// Resume positions of the partitions a group still reads.
#[derive(Debug, Clone)]
pub struct ResumePositions {
    stop: StopCondition,
    positions: BTreeMap<i32, ResumePosition>,
    /// Partitions that satisfied the stop condition; never tracked again.
    retired: BTreeSet<i32>,
}

impl ResumePositions {
    pub fn new(stop: StopCondition) -> Self {
        Self { stop, positions: BTreeMap::new(), retired: BTreeSet::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, partition: i32) -> Option<&ResumePosition> {
        self.positions.get(&partition)
    }

    pub fn is_retired(&self, partition: i32) -> bool {
        self.retired.contains(&partition)
    }

    /// Whether a record at `offset` belongs to this session.
    ///
    /// Under [`StopCondition::AtCurrentEnd`], records at or past `until` were
    /// produced after the session started and are excluded.
    pub fn admits(&self, partition: i32, offset: i64) -> bool {
        match self.stop {
            StopCondition::Continuously => true,
            StopCondition::AtCurrentEnd => self.positions.get(&partition).is_some_and(|p| offset < p.until),
        }
    }

    /// Fold one poll's progress into the positions.
    ///
    /// A new partition starts at its reported current offset with `until`
    /// fixed to the reported latest offset. Known partitions only move
    /// forward.
    pub fn observe(&mut self, progress: &[PartitionProgress]) {
        for p in progress {
            if self.retired.contains(&p.partition) {
                continue;
            }
            self.positions
                .entry(p.partition)
                .and_modify(|position| position.current = position.current.max(p.current_offset))
                .or_insert(ResumePosition { current: p.current_offset, until: p.latest_offset });
        }
    }

    /// Drop exhausted partitions (only under `AtCurrentEnd`). Returns them.
    pub fn retire_exhausted(&mut self) -> Vec<i32> {
        if self.stop == StopCondition::Continuously {
            return Vec::new();
        }
        let exhausted: Vec<i32> =
            self.positions.iter().filter(|(_, p)| p.is_exhausted()).map(|(&k, _)| k).collect();
        for partition in &exhausted {
            self.positions.remove(partition);
            self.retired.insert(*partition);
        }
        exhausted
    }

    /// Explicit assignment continuing after the last delivered offsets.
    pub fn next_offsets(&self) -> Vec<PartitionOffset> {
        self.positions.iter().map(|(&partition, p)| PartitionOffset::new(partition, p.current + 1)).collect()
    }
}

#[cfg(test)]
#[path = "resume_tests.rs"]
mod tests;
