// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster access used by the Kubernetes runner.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, ListParams, LogParams, PostParams, WatchParams};
use thiserror::Error;

use super::observe::UnitSnapshot;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cluster API error ({code}): {message}")]
    Api { code: u16, message: String },
    #[error("cluster request failed: {0}")]
    Request(String),
}

impl ClusterError {
    /// Whether the API rejected the request itself (bad spec, bad name).
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::Api { code: 400 | 422, .. })
    }
}

impl From<kube::Error> for ClusterError {
    fn from(e: kube::Error) -> Self {
        match e {
            kube::Error::Api(resp) => Self::Api { code: resp.code, message: resp.message },
            other => Self::Request(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchAction {
    Added,
    Modified,
    Deleted,
}

/// One lifecycle observation of an execution unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub action: WatchAction,
    pub unit: UnitSnapshot,
}

pub type WatchStream = BoxStream<'static, Result<WatchEvent, ClusterError>>;

/// Pod operations the runner needs, scoped to one namespace.
#[async_trait]
pub trait PodClient: Send + Sync + 'static {
    async fn create(&self, pod: &Pod) -> Result<(), ClusterError>;

    /// Delete one pod. Deleting a missing pod succeeds.
    async fn delete(&self, name: &str) -> Result<(), ClusterError>;

    /// Delete every pod matching `selector`.
    async fn delete_labeled(&self, selector: &str) -> Result<(), ClusterError>;

    /// Full log of one container.
    async fn logs(&self, name: &str, container: &str) -> Result<String, ClusterError>;

    /// Subscribe to lifecycle events of pods matching `selector`.
    ///
    /// The stream may end or error at any time; callers resubscribe.
    async fn watch(&self, selector: &str) -> Result<WatchStream, ClusterError>;
}

/// [`PodClient`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubePodClient {
    pods: Api<Pod>,
}

impl KubePodClient {
    /// Server-side watch timeout; the stream closes after this and is
    /// resubscribed.
    const WATCH_TIMEOUT_SECS: u32 = 290;

    pub fn new(client: kube::Client, namespace: &str) -> Self {
        Self { pods: Api::namespaced(client, namespace) }
    }

    pub async fn try_default(namespace: &str) -> Result<Self, ClusterError> {
        let client = kube::Client::try_default().await?;
        Ok(Self::new(client, namespace))
    }
}

#[async_trait]
impl PodClient for KubePodClient {
    async fn create(&self, pod: &Pod) -> Result<(), ClusterError> {
        self.pods.create(&PostParams::default(), pod).await?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), ClusterError> {
        match self.pods.delete(name, &DeleteParams::background()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_labeled(&self, selector: &str) -> Result<(), ClusterError> {
        self.pods
            .delete_collection(&DeleteParams::background(), &ListParams::default().labels(selector))
            .await?;
        Ok(())
    }

    async fn logs(&self, name: &str, container: &str) -> Result<String, ClusterError> {
        let lp = LogParams { container: Some(container.to_string()), ..Default::default() };
        Ok(self.pods.logs(name, &lp).await?)
    }

    async fn watch(&self, selector: &str) -> Result<WatchStream, ClusterError> {
        let wp = WatchParams::default().labels(selector).timeout(Self::WATCH_TIMEOUT_SECS);
        // Version "0" replays current state as ADDED, so a resubscribe cannot
        // miss a transition that happened while disconnected.
        let stream = self.pods.watch(&wp, "0").await?;
        Ok(stream
            .filter_map(|item| async move {
                let (action, pod) = match item {
                    Ok(kube::api::WatchEvent::Added(pod)) => (WatchAction::Added, pod),
                    Ok(kube::api::WatchEvent::Modified(pod)) => (WatchAction::Modified, pod),
                    Ok(kube::api::WatchEvent::Deleted(pod)) => (WatchAction::Deleted, pod),
                    Ok(kube::api::WatchEvent::Bookmark(_)) => return None,
                    Ok(kube::api::WatchEvent::Error(resp)) => {
                        return Some(Err(ClusterError::Api {
                            code: resp.code,
                            message: resp.message,
                        }))
                    }
                    Err(e) => return Some(Err(e.into())),
                };
                UnitSnapshot::from_pod(&pod).map(|unit| Ok(WatchEvent { action, unit }))
            })
            .boxed())
    }
}
