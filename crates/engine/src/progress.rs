// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;
use std::sync::Arc;

use kr_core::PartitionProgress;
use parking_lot::Mutex;

/// Session-wide progress shared by every read group.
#[derive(Debug, Clone, Default)]
pub struct ProgressAccumulator {
    inner: Arc<Mutex<BTreeMap<(String, i32), PartitionProgress>>>,
}

impl ProgressAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one poll's progress and return a snapshot of every partition
    /// seen so far, ordered by topic and partition.
    pub fn merge(&self, observed: &[PartitionProgress]) -> Vec<PartitionProgress> {
        let mut inner = self.inner.lock();
        for p in observed {
            inner
                .entry((p.topic.clone(), p.partition))
                .and_modify(|existing| existing.merge(p))
                .or_insert_with(|| p.clone());
        }
        inner.values().cloned().collect()
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
