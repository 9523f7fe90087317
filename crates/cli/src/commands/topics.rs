// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topic metadata commands: `topics`, `describe`, `offsets`

use std::io::Write;

use anyhow::Result;
use kr_adapters::{Runner, RunnerExt};
use kr_core::{
    DescribeTopicRequest, Function, ListTopicsRequest, ListTopicsResponse, QueryOffsetsRequest,
    QueryOffsetsResponse, TopicDescription,
};

use crate::output::{handle_list, json_line, OutputFormat, Table};

pub async fn list(
    runner: &dyn Runner,
    include_internal: bool,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    let response: ListTopicsResponse =
        runner.call(Function::ListTopics, &ListTopicsRequest { include_internal }).await?;

    handle_list(format, &response.topics, "No topics found", out, |topics, out| {
        let mut table = Table::new(&["NAME", "PARTITIONS"]);
        for topic in topics {
            table.row(vec![topic.name.clone(), topic.partitions.to_string()]);
        }
        table.render(out)
    })?;
    Ok(())
}

pub async fn describe(
    runner: &dyn Runner,
    topic: &str,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    let description = describe_topic(runner, topic).await?;
    match format {
        OutputFormat::Json => json_line(out, &description)?,
        OutputFormat::Text => {
            writeln!(out, "{} ({} partitions)", description.name, description.partitions.len())?;
            let mut table = Table::new(&["PARTITION", "EARLIEST", "LATEST", "RECORDS"]);
            for p in &description.partitions {
                table.row(vec![
                    p.partition.to_string(),
                    p.earliest_offset.to_string(),
                    p.latest_offset.to_string(),
                    (p.latest_offset - p.earliest_offset).to_string(),
                ]);
            }
            table.render(out)?;
        }
    }
    Ok(())
}

/// Offsets of the first record at or after `timestamp` on every partition.
pub async fn offsets(
    runner: &dyn Runner,
    topic: &str,
    timestamp: i64,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    let description = describe_topic(runner, topic).await?;
    let request = QueryOffsetsRequest {
        topic: topic.to_string(),
        partitions: description.partitions.iter().map(|p| p.partition).collect(),
        timestamp,
    };
    let response: QueryOffsetsResponse = runner.call(Function::QueryOffsets, &request).await?;

    handle_list(format, &response.offsets, "No partitions", out, |offsets, out| {
        let mut table = Table::new(&["PARTITION", "OFFSET"]);
        for o in offsets {
            table.row(vec![o.partition.to_string(), o.offset.to_string()]);
        }
        table.render(out)
    })?;
    Ok(())
}

async fn describe_topic(runner: &dyn Runner, topic: &str) -> Result<TopicDescription> {
    let description =
        runner.call(Function::DescribeTopic, &DescribeTopicRequest { topic: topic.to_string() }).await?;
    Ok(description)
}

#[cfg(test)]
#[path = "topics_tests.rs"]
mod tests;
