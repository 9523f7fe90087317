// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kr-worker <envelope-json> <output-path>`
//!
//! Runs one call and writes its response (exit 0) or failure envelope
//! (exit 1) to the output path. Exit 2 means the result could not be written.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use kr_worker::{execute_envelope, Broker, Dispatcher, MemoryBroker};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BrokerKind {
    Kafka,
    Memory,
}

#[derive(Debug, Parser)]
#[command(name = "kr-worker", version, about = "Execute one kr call envelope")]
struct Args {
    /// Serialized call envelope
    envelope: String,
    /// Where to write the response or failure envelope
    output: PathBuf,
    #[arg(long, env = "KR_BROKER", value_enum, default_value = "kafka")]
    broker: BrokerKind,
    #[arg(long, env = "KR_BOOTSTRAP_SERVERS", default_value = "localhost:9092")]
    bootstrap_servers: String,
    /// Seed data for the memory broker
    #[arg(long, env = "KR_FIXTURE")]
    fixture: Option<PathBuf>,
}

fn broker(args: &Args) -> Result<Arc<dyn Broker>, kr_worker::BrokerError> {
    match args.broker {
        BrokerKind::Memory => Ok(Arc::new(match &args.fixture {
            Some(path) => MemoryBroker::from_path(path)?,
            None => MemoryBroker::new(),
        })),
        #[cfg(feature = "kafka")]
        BrokerKind::Kafka => Ok(Arc::new(kr_worker::KafkaBroker::new(&args.bootstrap_servers)?)),
        #[cfg(not(feature = "kafka"))]
        BrokerKind::Kafka => Err(kr_worker::BrokerError::InvalidRequest(format!(
            "kafka support not built in (bootstrap servers {})",
            args.bootstrap_servers
        ))),
    }
}

#[tokio::main]
async fn main() {
    kr_worker::logging::init();
    let args = Args::parse();

    // A broker that cannot be built is still reported through the output
    // file, so the caller sees a structured failure.
    let handler: Box<dyn kr_core::FunctionHandler> = match broker(&args) {
        Ok(broker) => Box::new(Dispatcher::new(broker)),
        Err(e) => Box::new(Unavailable(kr_core::FailureEnvelope::from_error("BrokerError", &e))),
    };

    let code = match execute_envelope(&*handler, &args.envelope, &args.output).await {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            tracing::error!(output = %args.output.display(), error = %e, "cannot write call result");
            2
        }
    };
    std::process::exit(code);
}

/// Handler that fails every call with the same envelope.
struct Unavailable(kr_core::FailureEnvelope);

#[async_trait::async_trait]
impl kr_core::FunctionHandler for Unavailable {
    async fn handle(&self, _function: &str, _payload: &str) -> Result<String, kr_core::FailureEnvelope> {
        Err(self.0.clone())
    }
}
