// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pod lifecycle observations.
//!
//! The watcher only needs a narrow projection of a pod: its name, whether
//! the scheduler rejected it, and the state of the `call` container. That
//! projection is classified into the one decision the watcher acts on.

use k8s_openapi::api::core::v1::{ContainerState, Pod};

/// Primary container: runs the call.
pub const CALL_CONTAINER: &str = "call";
/// Secondary container: exposes the output file through its log.
pub const OUTPUT_CONTAINER: &str = "output";

/// Waiting reasons meaning the call container will never start on its own.
const INFRA_WAITING_REASONS: &[&str] = &[
    "ErrImagePull",
    "ImagePullBackOff",
    "ErrImageNeverPull",
    "InvalidImageName",
    "CreateContainerConfigError",
    "CreateContainerError",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerPhase {
    Waiting { reason: Option<String>, message: Option<String> },
    Running,
    Terminated { exit_code: i32, reason: Option<String> },
}

/// Projection of a pod carrying only what correlation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSnapshot {
    pub name: String,
    /// Pod phase as reported by the kubelet ("Pending", "Running", ...).
    pub phase: Option<String>,
    /// Scheduler message when the pod is marked unschedulable.
    pub unschedulable: Option<String>,
    pub call: Option<ContainerPhase>,
}

impl UnitSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), phase: None, unschedulable: None, call: None }
    }

    /// Project a pod. Returns `None` for pods without a name.
    pub fn from_pod(pod: &Pod) -> Option<Self> {
        let name = pod.metadata.name.clone()?;
        let status = pod.status.as_ref();

        let unschedulable = status
            .and_then(|s| s.conditions.as_ref())
            .and_then(|conditions| {
                conditions.iter().find(|c| {
                    c.type_ == "PodScheduled"
                        && c.status == "False"
                        && c.reason.as_deref() == Some("Unschedulable")
                })
            })
            .map(|c| c.message.clone().unwrap_or_else(|| "unschedulable".to_string()));

        let call = status
            .and_then(|s| s.container_statuses.as_ref())
            .and_then(|statuses| statuses.iter().find(|s| s.name == CALL_CONTAINER))
            .and_then(|s| s.state.as_ref())
            .and_then(container_phase);

        Some(Self { name, phase: status.and_then(|s| s.phase.clone()), unschedulable, call })
    }
}

fn container_phase(state: &ContainerState) -> Option<ContainerPhase> {
    if let Some(t) = &state.terminated {
        return Some(ContainerPhase::Terminated { exit_code: t.exit_code, reason: t.reason.clone() });
    }
    if state.running.is_some() {
        return Some(ContainerPhase::Running);
    }
    state.waiting.as_ref().map(|w| ContainerPhase::Waiting {
        reason: w.reason.clone(),
        message: w.message.clone(),
    })
}

/// What one observation means for the pending call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitObservation {
    /// No container state yet.
    NotScheduled,
    /// The unit cannot start; resolve immediately.
    InfraFailure(String),
    Succeeded,
    Failed { exit_code: i32 },
    /// Anything else (creating, running, transient waits).
    Other,
}

pub fn observe(unit: &UnitSnapshot) -> UnitObservation {
    match &unit.call {
        Some(ContainerPhase::Terminated { exit_code: 0, .. }) => UnitObservation::Succeeded,
        Some(ContainerPhase::Terminated { exit_code, .. }) => {
            UnitObservation::Failed { exit_code: *exit_code }
        }
        Some(ContainerPhase::Waiting { reason: Some(reason), message })
            if INFRA_WAITING_REASONS.contains(&reason.as_str()) =>
        {
            UnitObservation::InfraFailure(match message {
                Some(message) => format!("{reason}: {message}"),
                None => reason.clone(),
            })
        }
        _ if unit.unschedulable.is_some() => UnitObservation::InfraFailure(format!(
            "Unschedulable: {}",
            unit.unschedulable.as_deref().unwrap_or_default()
        )),
        None => UnitObservation::NotScheduled,
        Some(_) => UnitObservation::Other,
    }
}

#[cfg(test)]
#[path = "observe_tests.rs"]
mod tests;
