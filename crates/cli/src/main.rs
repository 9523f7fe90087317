// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kr: read and write broker topics through a pluggable runner

mod color;
mod commands;
mod config;
mod exit_error;
mod output;
mod runner;

use std::io::Write;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use kr_core::RunnerError;

use crate::commands::consume::ConsumeArgs;
use crate::commands::produce::ProduceArgs;
use crate::config::{Config, RunnerKind};
use crate::exit_error::{ExitError, EXIT_FAILURE};
use crate::output::OutputFormat;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

#[derive(Parser)]
#[command(name = "kr", version = VERSION, about, styles = color::styles())]
struct Cli {
    /// Execution backend (overrides config and KR_RUNNER)
    #[arg(long, global = true, value_enum)]
    runner: Option<RunnerKind>,

    /// Output format for metadata commands
    #[arg(long, short = 'o', global = true, value_enum, default_value_t)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List topics
    Topics {
        /// Include internal topics (names starting with "__")
        #[arg(long)]
        all: bool,
    },
    /// Show partitions and watermarks of a topic
    Describe {
        topic: String,
    },
    /// Look up the first offset at or after a timestamp on every partition
    Offsets {
        topic: String,
        /// Milliseconds since the epoch
        #[arg(long)]
        at: i64,
    },
    /// Stream records as JSON lines
    Consume(ConsumeArgs),
    /// Produce records
    Produce(ProduceArgs),
}

#[tokio::main]
async fn main() {
    kr_worker::logging::init();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let exit = into_exit_error(err);
        let _ = std::io::stdout().flush();
        eprintln!("error: {}", exit.message);
        std::process::exit(exit.code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let mut config = Config::load().map_err(|e| ExitError::usage(e.to_string()))?;
    if let Some(runner) = cli.runner {
        config.runner = runner;
    }

    let runner = runner::connect(&config).await?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let result = match &command {
        Command::Topics { all } => commands::topics::list(&*runner, *all, cli.output, &mut out).await,
        Command::Describe { topic } => {
            commands::topics::describe(&*runner, topic, cli.output, &mut out).await
        }
        Command::Offsets { topic, at } => {
            commands::topics::offsets(&*runner, topic, *at, cli.output, &mut out).await
        }
        Command::Consume(args) => {
            let mut progress = std::io::stderr();
            commands::consume::run(std::sync::Arc::clone(&runner), args, &mut out, &mut progress).await
        }
        Command::Produce(args) => {
            let mut input = std::io::stdin().lock();
            commands::produce::run(&*runner, args, &mut input, cli.output, &mut out).await
        }
    };

    runner.shutdown().await;
    result
}

fn into_exit_error(err: anyhow::Error) -> ExitError {
    let err = match err.downcast::<ExitError>() {
        Ok(exit) => return exit,
        Err(err) => err,
    };
    match err.downcast::<RunnerError>() {
        Ok(runner_error) => ExitError::from(runner_error),
        Err(err) => ExitError::new(EXIT_FAILURE, format!("{err:#}")),
    }
}
