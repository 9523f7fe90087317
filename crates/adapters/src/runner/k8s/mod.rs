// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes runner: one ephemeral pod per call.
//!
//! Each call becomes a pod labeled with this runner's id. A single watcher
//! task observes those pods and resolves the matching pending call once the
//! `call` container terminates or is found unable to start. The result is
//! read back from the `output` container's log.

pub mod client;
pub mod observe;
pub mod pod;
mod watch;

#[cfg(any(test, feature = "test-support"))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakePodClient;

pub use client::{ClusterError, KubePodClient, PodClient, WatchAction, WatchEvent, WatchStream};

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kr_core::{CallEnvelope, RunnerError};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use self::pod::{build_pod, runner_selector, UnitParams};
use self::watch::{OutputRead, PendingCalls, Watcher};
use super::Runner;

const NAME: &str = "kubernetes";

/// Pod template and runner behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KubernetesConfig {
    pub namespace: String,
    pub image: String,
    pub image_pull_policy: Option<String>,
    pub cpu: String,
    pub memory: String,
    pub service_account: Option<String>,
    /// Absolute path the worker writes its response to.
    pub output_path: String,
    /// Image of the output sidecar; needs `sh`, `cat` and `sleep`.
    pub output_image: String,
    /// How long the sidecar keeps its log readable after printing.
    pub output_linger_secs: u64,
    pub timeout_ms: u64,
    pub auto_delete: bool,
    pub env: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub node_selector: BTreeMap<String, String>,
    pub reconnect_backoff_ms: u64,
    pub output_read_attempts: u32,
    pub output_read_interval_ms: u64,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            image: "kr-worker:latest".to_string(),
            image_pull_policy: None,
            cpu: "250m".to_string(),
            memory: "256Mi".to_string(),
            service_account: None,
            output_path: "/kr/output/result.json".to_string(),
            output_image: "busybox:1.36".to_string(),
            output_linger_secs: 600,
            timeout_ms: 120_000,
            auto_delete: true,
            env: BTreeMap::new(),
            labels: BTreeMap::new(),
            node_selector: BTreeMap::new(),
            reconnect_backoff_ms: 1_000,
            output_read_attempts: 10,
            output_read_interval_ms: 500,
        }
    }
}

impl KubernetesConfig {
    kr_core::setters! {
        into {
            namespace: String,
            image: String,
            cpu: String,
            memory: String,
            output_path: String,
        }
        set {
            timeout_ms: u64,
            auto_delete: bool,
            reconnect_backoff_ms: u64,
            output_read_attempts: u32,
            output_read_interval_ms: u64,
        }
        option {
            service_account: String,
            image_pull_policy: String,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Directory mounted as the shared output volume.
    pub fn output_dir(&self) -> String {
        Path::new(&self.output_path)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "/".to_string())
    }

    pub fn validate(&self) -> Result<(), RunnerError> {
        let invalid = |message: String| Err(RunnerError::argument(NAME, message));
        if self.namespace.trim().is_empty() {
            return invalid("namespace must not be empty".to_string());
        }
        if self.image.trim().is_empty() {
            return invalid("image must not be empty".to_string());
        }
        if !self.output_path.starts_with('/') || self.output_path.ends_with('/') {
            return invalid(format!("output_path must be an absolute file path: {}", self.output_path));
        }
        if self.timeout_ms == 0 {
            return invalid("timeout_ms must be positive".to_string());
        }
        Ok(())
    }

    fn output_read(&self) -> OutputRead {
        OutputRead {
            attempts: self.output_read_attempts,
            interval: Duration::from_millis(self.output_read_interval_ms),
        }
    }
}

pub struct KubernetesRunner<C: PodClient = KubePodClient> {
    client: Arc<C>,
    config: KubernetesConfig,
    runner_id: String,
    pending: PendingCalls,
    cancel: CancellationToken,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl KubernetesRunner<KubePodClient> {
    /// Connect with the ambient kubeconfig or in-cluster credentials.
    pub async fn connect(config: KubernetesConfig) -> Result<Self, RunnerError> {
        config.validate()?;
        let client = KubePodClient::try_default(&config.namespace)
            .await
            .map_err(|e| RunnerError::infra(NAME, format!("cannot reach cluster: {e}")))?;
        Self::new(client, config)
    }
}

impl<C: PodClient> KubernetesRunner<C> {
    pub const NAME: &'static str = NAME;

    /// Build the runner and start its watcher. Must be called inside a tokio
    /// runtime.
    pub fn new(client: C, config: KubernetesConfig) -> Result<Self, RunnerError> {
        config.validate()?;
        let client = Arc::new(client);
        let runner_id = uuid::Uuid::new_v4().simple().to_string();
        let pending = PendingCalls::default();
        let cancel = CancellationToken::new();

        let watcher = Watcher {
            client: Arc::clone(&client),
            selector: runner_selector(&runner_id),
            pending: Arc::clone(&pending),
            output: config.output_read(),
            backoff: Duration::from_millis(config.reconnect_backoff_ms),
            cancel: cancel.clone(),
        };
        let handle = tokio::spawn(watcher.run());

        tracing::debug!(%runner_id, namespace = %config.namespace, "kubernetes runner started");
        Ok(Self { client, config, runner_id, pending, cancel, watcher: Mutex::new(Some(handle)) })
    }

    /// Label selector matching every unit this runner created.
    pub fn selector(&self) -> String {
        runner_selector(&self.runner_id)
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

#[async_trait]
impl<C: PodClient> Runner for KubernetesRunner<C> {
    fn name(&self) -> &str {
        NAME
    }

    async fn launch(&self, function: &str, payload: &str) -> Result<String, RunnerError> {
        let name = unit_name(function);
        let envelope = CallEnvelope::new(function, payload);
        let pod = build_pod(&UnitParams {
            name: name.clone(),
            runner_id: &self.runner_id,
            function,
            args: envelope.container_args(&self.config.output_path),
            config: &self.config,
        });

        // Registered before creation so no event for the unit is missed.
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(name.clone(), tx);
        let mut guard = UnitGuard {
            client: Arc::clone(&self.client),
            pending: Arc::clone(&self.pending),
            name: name.clone(),
            created: false,
            auto_delete: self.config.auto_delete,
            finished: false,
        };

        if let Err(e) = self.client.create(&pod).await {
            tracing::error!(unit = %name, function, error = %e, "failed to create execution unit");
            guard.finish().await;
            return Err(if e.is_invalid_request() {
                RunnerError::argument(NAME, format!("invalid execution unit {name}: {e}"))
            } else {
                RunnerError::transport(NAME, format!("cannot create execution unit {name}: {e}"))
            });
        }
        guard.created = true;
        tracing::info!(unit = %name, function, "execution unit created");

        let timeout = self.config.timeout();
        let result = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RunnerError::transport(
                NAME,
                format!("execution unit {name} was abandoned before completing"),
            )),
            Err(_) => {
                tracing::warn!(unit = %name, function, "execution unit timed out");
                Err(RunnerError::timeout(
                    NAME,
                    format!("{function} on {name} did not complete within {}ms", timeout.as_millis()),
                ))
            }
        };

        guard.finish().await;
        result
    }

    async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.watcher.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        let drained: Vec<_> = self.pending.lock().drain().collect();
        for (unit, tx) in drained {
            tracing::debug!(%unit, "failing in-flight call on shutdown");
            let _ = tx.send(Err(RunnerError::transport(NAME, "runner shut down")));
        }

        let selector = self.selector();
        if let Err(e) = self.client.delete_labeled(&selector).await {
            tracing::warn!(%selector, error = %e, "failed to sweep execution units on shutdown");
        }
    }
}

impl<C: PodClient> Drop for KubernetesRunner<C> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Removes the pending entry and (optionally) the unit once the launch ends,
/// including when the launch future is dropped mid-flight.
struct UnitGuard<C: PodClient> {
    client: Arc<C>,
    pending: PendingCalls,
    name: String,
    created: bool,
    auto_delete: bool,
    finished: bool,
}

impl<C: PodClient> UnitGuard<C> {
    async fn finish(&mut self) {
        self.finished = true;
        self.pending.lock().remove(&self.name);
        if self.created && self.auto_delete {
            delete_unit(&*self.client, &self.name).await;
        }
    }
}

impl<C: PodClient> Drop for UnitGuard<C> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.pending.lock().remove(&self.name);
        if !(self.created && self.auto_delete) {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(unit = %self.name, "no runtime to delete abandoned execution unit");
            return;
        };
        let client = Arc::clone(&self.client);
        let name = std::mem::take(&mut self.name);
        handle.spawn(async move {
            tracing::debug!(unit = %name, "deleting execution unit of cancelled call");
            delete_unit(&*client, &name).await;
        });
    }
}

async fn delete_unit<C: PodClient + ?Sized>(client: &C, name: &str) {
    match client.delete(name).await {
        Ok(()) => tracing::debug!(unit = %name, "execution unit deleted"),
        Err(e) => tracing::warn!(unit = %name, error = %e, "failed to delete execution unit"),
    }
}

/// `kr-<function>-<12 hex>`, restricted to DNS-label characters.
fn unit_name(function: &str) -> String {
    let function: String = function
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .take(40)
        .collect();
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("kr-{}-{}", function.trim_matches('-'), &id[..12])
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
