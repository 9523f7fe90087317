// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kr produce`: append records to a topic

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use clap::Args;
use kr_adapters::{Runner, RunnerExt};
use kr_core::{Function, ProduceRequest, ProduceResponse};

use crate::output::{json_line, OutputFormat};

#[derive(Debug, Clone, Args)]
pub struct ProduceArgs {
    /// Target topic
    pub topic: String,
    /// Record value; one record per stdin line when omitted
    pub value: Option<String>,
    /// Record key (also picks the partition unless --partition is given)
    #[arg(long, short = 'k')]
    pub key: Option<String>,
    /// Explicit partition
    #[arg(long, short = 'p')]
    pub partition: Option<i32>,
    /// Record timestamp in milliseconds since the epoch
    #[arg(long)]
    pub timestamp: Option<i64>,
}

impl ProduceArgs {
    fn request(&self, value: String) -> ProduceRequest {
        ProduceRequest {
            topic: self.topic.clone(),
            partition: self.partition,
            key: self.key.clone(),
            value,
            timestamp: self.timestamp,
        }
    }
}

pub async fn run(
    runner: &dyn Runner,
    args: &ProduceArgs,
    input: &mut dyn BufRead,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    let values: Vec<String> = match &args.value {
        Some(value) => vec![value.clone()],
        None => input
            .lines()
            .filter(|line| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
            .collect::<Result<_, _>>()
            .context("cannot read records from stdin")?,
    };

    for value in values {
        let response: ProduceResponse = runner.call(Function::Produce, &args.request(value)).await?;
        match format {
            OutputFormat::Json => json_line(out, &response)?,
            OutputFormat::Text => {
                writeln!(out, "{} partition {} offset {}", args.topic, response.partition, response.offset)?
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "produce_tests.rs"]
mod tests;
