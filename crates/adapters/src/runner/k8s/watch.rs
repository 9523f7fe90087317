// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch-and-correlate loop.
//!
//! One task per runner subscribes to unit events, resubscribes whenever the
//! stream closes or errors, and resolves pending calls. Resolving removes the
//! call from the pending map, so later events for the same unit are no-ops.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use kr_core::{FailureEnvelope, RunnerError};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::client::{PodClient, WatchEvent};
use super::observe::{observe, UnitObservation, OUTPUT_CONTAINER};
use super::NAME;

pub(super) type CallResult = Result<String, RunnerError>;

/// In-flight calls keyed by unit name.
pub(super) type PendingCalls = Arc<Mutex<HashMap<String, oneshot::Sender<CallResult>>>>;

/// How output is pulled from a terminated unit.
#[derive(Debug, Clone, Copy)]
pub(super) struct OutputRead {
    pub attempts: u32,
    pub interval: Duration,
}

pub(super) struct Watcher<C: PodClient> {
    pub client: Arc<C>,
    pub selector: String,
    pub pending: PendingCalls,
    pub output: OutputRead,
    pub backoff: Duration,
    pub cancel: CancellationToken,
}

impl<C: PodClient> Watcher<C> {
    pub(super) async fn run(self) {
        tracing::debug!(selector = %self.selector, "unit watcher started");
        loop {
            let subscribed = tokio::select! {
                _ = self.cancel.cancelled() => break,
                subscribed = self.client.watch(&self.selector) => subscribed,
            };

            match subscribed {
                Ok(mut stream) => loop {
                    let next = tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        next = stream.next() => next,
                    };
                    match next {
                        Some(Ok(event)) => self.dispatch(event),
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "unit watch stream failed, resubscribing");
                            break;
                        }
                        None => {
                            tracing::debug!("unit watch stream closed, resubscribing");
                            break;
                        }
                    }
                },
                Err(e) => tracing::warn!(error = %e, "unit watch subscription failed"),
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.backoff) => {}
            }
        }
        tracing::debug!(selector = %self.selector, "unit watcher stopped");
    }

    /// Apply one event to its pending call, if any.
    pub(super) fn dispatch(&self, event: WatchEvent) {
        let unit = event.unit.name.as_str();
        if !self.pending.lock().contains_key(unit) {
            tracing::trace!(%unit, action = ?event.action, "event for unit without pending call");
            return;
        }

        match observe(&event.unit) {
            UnitObservation::NotScheduled => {
                tracing::debug!(%unit, action = ?event.action, "unit not yet scheduled")
            }
            UnitObservation::Other => {
                tracing::debug!(%unit, action = ?event.action, phase = ?event.unit.phase, "unit progressed")
            }
            UnitObservation::InfraFailure(reason) => {
                tracing::warn!(%unit, %reason, "unit cannot start");
                if let Some(tx) = self.claim(unit) {
                    let _ = tx.send(Err(RunnerError::infra(
                        NAME,
                        format!("execution unit {unit} cannot start: {reason}"),
                    )));
                }
            }
            UnitObservation::Succeeded => {
                if let Some(tx) = self.claim(unit) {
                    tracing::debug!(%unit, "unit succeeded, reading output");
                    let client = Arc::clone(&self.client);
                    let unit = unit.to_string();
                    let output = self.output;
                    tokio::spawn(async move {
                        let result = match read_output(&*client, &unit, output).await {
                            Some(body) => Ok(body),
                            None => Err(RunnerError::transport(
                                NAME,
                                format!("execution unit {unit} succeeded but its output is unavailable"),
                            )),
                        };
                        let _ = tx.send(result);
                    });
                }
            }
            UnitObservation::Failed { exit_code } => {
                if let Some(tx) = self.claim(unit) {
                    tracing::debug!(%unit, exit_code, "unit failed, reading failure envelope");
                    let client = Arc::clone(&self.client);
                    let unit = unit.to_string();
                    let output = self.output;
                    tokio::spawn(async move {
                        let body = read_output(&*client, &unit, output).await;
                        let error = match body.as_deref().and_then(FailureEnvelope::parse) {
                            Some(envelope) => envelope.into_runner_error(NAME),
                            None => RunnerError::remote(
                                NAME,
                                format!("execution unit {unit} exited with status {exit_code}"),
                            ),
                        };
                        let _ = tx.send(Err(error));
                    });
                }
            }
        }
    }

    /// Take the pending call for `unit`; at most one caller ever gets it.
    fn claim(&self, unit: &str) -> Option<oneshot::Sender<CallResult>> {
        self.pending.lock().remove(unit)
    }
}

/// Read the output container's log, retrying while it is still empty.
async fn read_output<C: PodClient + ?Sized>(
    client: &C,
    unit: &str,
    output: OutputRead,
) -> Option<String> {
    for attempt in 0..output.attempts.max(1) {
        if attempt > 0 {
            tokio::time::sleep(output.interval).await;
        }
        match client.logs(unit, OUTPUT_CONTAINER).await {
            Ok(body) if !body.trim().is_empty() => return Some(body.trim_end().to_string()),
            Ok(_) => tracing::trace!(%unit, attempt, "unit output not yet available"),
            Err(e) => tracing::debug!(%unit, attempt, error = %e, "unit output read failed"),
        }
    }
    None
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
