// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Split `partitions` into read groups, round-robin by index.
///
/// The group count is `parallelism` clamped to `1..=partitions.len()`, so no
/// group is ever empty. An empty partition list yields no groups.
pub fn partition_groups(partitions: &[i32], parallelism: usize) -> Vec<Vec<i32>> {
    if partitions.is_empty() {
        return Vec::new();
    }
    let count = parallelism.clamp(1, partitions.len());
    let mut groups = vec![Vec::new(); count];
    for (index, &partition) in partitions.iter().enumerate() {
        groups[index % count].push(partition);
    }
    groups
}

#[cfg(test)]
#[path = "grouping_tests.rs"]
mod tests;
