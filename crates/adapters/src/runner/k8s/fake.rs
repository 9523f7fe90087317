// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable pod client for tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};

use super::client::{ClusterError, PodClient, WatchAction, WatchEvent, WatchStream};
use super::observe::{ContainerPhase, UnitSnapshot};

#[derive(Default)]
struct State {
    created: Vec<Pod>,
    deleted: Vec<String>,
    swept: Vec<String>,
    logs: HashMap<(String, String), String>,
    create_error: Option<ClusterError>,
    subscribers: Vec<mpsc::UnboundedSender<Result<WatchEvent, ClusterError>>>,
    subscriptions: usize,
}

/// In-memory [`PodClient`].
///
/// Records every mutation, serves scripted logs, and hands each `watch`
/// caller a stream fed by [`FakePodClient::emit`].
#[derive(Clone, Default)]
pub struct FakePodClient {
    state: Arc<Mutex<State>>,
    changed: Arc<Notify>,
}

impl FakePodClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create` fail.
    pub fn fail_create(&self, error: ClusterError) {
        self.state.lock().create_error = Some(error);
    }

    pub fn set_logs(&self, pod: &str, container: &str, body: &str) {
        self.state.lock().logs.insert((pod.to_string(), container.to_string()), body.to_string());
    }

    pub fn created(&self) -> Vec<Pod> {
        self.state.lock().created.clone()
    }

    pub fn created_names(&self) -> Vec<String> {
        self.created().into_iter().filter_map(|p| p.metadata.name).collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }

    /// Selectors passed to `delete_labeled`.
    pub fn swept(&self) -> Vec<String> {
        self.state.lock().swept.clone()
    }

    /// Number of `watch` calls so far.
    pub fn subscriptions(&self) -> usize {
        self.state.lock().subscriptions
    }

    /// Send one event to every open watch stream.
    pub fn emit(&self, action: WatchAction, unit: UnitSnapshot) {
        let event = WatchEvent { action, unit };
        self.state.lock().subscribers.retain(|tx| tx.send(Ok(event.clone())).is_ok());
    }

    /// Convenience: the `call` container of `pod` entered `phase`.
    pub fn emit_call(&self, pod: &str, phase: ContainerPhase) {
        let mut unit = UnitSnapshot::new(pod);
        unit.call = Some(phase);
        self.emit(WatchAction::Modified, unit);
    }

    /// Fail every open watch stream.
    pub fn fail_streams(&self, message: &str) {
        let subscribers = std::mem::take(&mut self.state.lock().subscribers);
        for tx in subscribers {
            let _ = tx.send(Err(ClusterError::Request(message.to_string())));
        }
    }

    /// End every open watch stream.
    pub fn close_streams(&self) {
        self.state.lock().subscribers.clear();
    }

    /// Wait until a pod has been created, returning its name.
    pub async fn next_created(&self, already_seen: usize) -> String {
        loop {
            let notified = self.changed.notified();
            if let Some(name) =
                self.state.lock().created.get(already_seen).and_then(|p| p.metadata.name.clone())
            {
                return name;
            }
            notified.await;
        }
    }

    /// Wait until `watch` has been called at least `count` times.
    pub async fn wait_for_subscriptions(&self, count: usize) {
        loop {
            let notified = self.changed.notified();
            if self.state.lock().subscriptions >= count {
                return;
            }
            notified.await;
        }
    }

    /// Let spawned tasks (output reads, deferred deletes) run.
    pub async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[async_trait]
impl PodClient for FakePodClient {
    async fn create(&self, pod: &Pod) -> Result<(), ClusterError> {
        let mut state = self.state.lock();
        if let Some(error) = state.create_error.take() {
            return Err(error);
        }
        state.created.push(pod.clone());
        drop(state);
        self.changed.notify_waiters();
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), ClusterError> {
        self.state.lock().deleted.push(name.to_string());
        self.changed.notify_waiters();
        Ok(())
    }

    async fn delete_labeled(&self, selector: &str) -> Result<(), ClusterError> {
        self.state.lock().swept.push(selector.to_string());
        Ok(())
    }

    async fn logs(&self, name: &str, container: &str) -> Result<String, ClusterError> {
        Ok(self
            .state
            .lock()
            .logs
            .get(&(name.to_string(), container.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn watch(&self, _selector: &str) -> Result<WatchStream, ClusterError> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut state = self.state.lock();
            state.subscribers.push(tx);
            state.subscriptions += 1;
        }
        self.changed.notify_waiters();
        Ok(futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed())
    }
}
