// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build the configured runner.

use std::sync::Arc;
use std::time::Duration;

use kr_adapters::{KubernetesRunner, LocalRunner, Runner};
use kr_core::RunnerError;
use kr_worker::{Broker, Dispatcher, MemoryBroker};

use crate::config::{BrokerKind, Config, LocalConfig, RunnerKind};

pub async fn connect(config: &Config) -> Result<Arc<dyn Runner>, RunnerError> {
    let runner: Arc<dyn Runner> = match config.runner {
        RunnerKind::Local => {
            let broker = local_broker(&config.local)?;
            Arc::new(
                LocalRunner::new(Arc::new(Dispatcher::new(broker)), config.local.pool_size)
                    .timeout(Duration::from_millis(config.local.timeout_ms)),
            )
        }
        RunnerKind::Lambda => lambda(config).await?,
        RunnerKind::Kubernetes => Arc::new(KubernetesRunner::connect(config.kubernetes.clone()).await?),
    };
    tracing::debug!(runner = runner.name(), "runner ready");
    Ok(runner)
}

fn local_broker(config: &LocalConfig) -> Result<Arc<dyn Broker>, RunnerError> {
    let invalid = |e: kr_worker::BrokerError| RunnerError::argument(LocalRunner::NAME, e.to_string());
    match config.broker {
        BrokerKind::Memory => Ok(Arc::new(match &config.fixture {
            Some(path) => MemoryBroker::from_path(path).map_err(invalid)?,
            None => MemoryBroker::new(),
        })),
        #[cfg(feature = "kafka")]
        BrokerKind::Kafka => Ok(Arc::new(
            kr_worker::KafkaBroker::new(&config.bootstrap_servers).map_err(invalid)?,
        )),
        #[cfg(not(feature = "kafka"))]
        BrokerKind::Kafka => Err(RunnerError::argument(
            LocalRunner::NAME,
            format!(
                "kafka support not built in (bootstrap servers {}); rebuild with --features kafka or use broker = \"memory\"",
                config.bootstrap_servers
            ),
        )),
    }
}

#[cfg(feature = "lambda")]
async fn lambda(config: &Config) -> Result<Arc<dyn Runner>, RunnerError> {
    use kr_adapters::{LambdaInvoker, ServerlessRunner};

    let invoker = LambdaInvoker::from_env().await;
    Ok(Arc::new(
        ServerlessRunner::new(invoker, config.lambda.function_name.clone())
            .timeout(Duration::from_millis(config.lambda.timeout_ms)),
    ))
}

#[cfg(not(feature = "lambda"))]
async fn lambda(config: &Config) -> Result<Arc<dyn Runner>, RunnerError> {
    Err(RunnerError::argument(
        "lambda",
        format!(
            "lambda support not built in (function {}); rebuild with --features lambda",
            config.lambda.function_name
        ),
    ))
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
