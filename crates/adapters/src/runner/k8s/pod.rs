// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pod spec construction for execution units.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, EmptyDirVolumeSource, EnvVar, Pod, PodSpec, ResourceRequirements, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::observe::{CALL_CONTAINER, OUTPUT_CONTAINER};
use super::KubernetesConfig;

/// Fixed marker carried by every unit this tool creates.
pub const OWNER_LABEL: &str = "kr.dev/owner";
pub const OWNER_VALUE: &str = "kr-runner";
/// Per-runner-instance id, scoping the watch and the shutdown sweep.
pub const RUNNER_ID_LABEL: &str = "kr.dev/runner-id";
pub const FUNCTION_LABEL: &str = "kr.dev/function";

const OUTPUT_VOLUME: &str = "output";

/// Parameters for building one execution unit.
pub(super) struct UnitParams<'a> {
    pub name: String,
    pub runner_id: &'a str,
    pub function: &'a str,
    /// Envelope followed by the output path.
    pub args: Vec<String>,
    pub config: &'a KubernetesConfig,
}

/// Label selector matching every unit of one runner instance.
pub fn runner_selector(runner_id: &str) -> String {
    format!("{OWNER_LABEL}={OWNER_VALUE},{RUNNER_ID_LABEL}={runner_id}")
}

/// Build the pod for one call.
pub(super) fn build_pod(params: &UnitParams<'_>) -> Pod {
    let config = params.config;
    let output_dir = config.output_dir();

    let output_mount = VolumeMount {
        name: OUTPUT_VOLUME.to_string(),
        mount_path: output_dir,
        ..Default::default()
    };

    let mut env: Vec<EnvVar> = config.env.iter().map(|(k, v)| env_var(k, v)).collect();
    env.push(env_var("KR_OUTPUT", &config.output_path));

    let call = Container {
        name: CALL_CONTAINER.to_string(),
        image: Some(config.image.clone()),
        image_pull_policy: config.image_pull_policy.clone(),
        args: Some(params.args.clone()),
        env: Some(env),
        resources: Some(resources(&config.cpu, &config.memory)),
        volume_mounts: Some(vec![output_mount.clone()]),
        ..Default::default()
    };

    // Waits for the output file, prints it once, then lingers so its log
    // stays readable after the call container exits.
    let script = format!(
        "while [ ! -f \"$KR_OUTPUT\" ]; do sleep 0.2; done; sleep 0.2; cat \"$KR_OUTPUT\"; sleep {}",
        config.output_linger_secs
    );
    let output = Container {
        name: OUTPUT_CONTAINER.to_string(),
        image: Some(config.output_image.clone()),
        command: Some(vec!["sh".to_string(), "-c".to_string(), script]),
        env: Some(vec![env_var("KR_OUTPUT", &config.output_path)]),
        resources: Some(resources("10m", "16Mi")),
        volume_mounts: Some(vec![output_mount]),
        ..Default::default()
    };

    // Reserved labels go last: the watch selector and the shutdown sweep
    // depend on them.
    let labels: BTreeMap<String, String> = config
        .labels
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .chain([
            (OWNER_LABEL.to_string(), OWNER_VALUE.to_string()),
            (RUNNER_ID_LABEL.to_string(), params.runner_id.to_string()),
            (FUNCTION_LABEL.to_string(), params.function.to_string()),
        ])
        .collect();

    Pod {
        metadata: ObjectMeta {
            name: Some(params.name.clone()),
            namespace: Some(config.namespace.clone()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![call, output],
            volumes: Some(vec![Volume {
                name: OUTPUT_VOLUME.to_string(),
                empty_dir: Some(EmptyDirVolumeSource::default()),
                ..Default::default()
            }]),
            restart_policy: Some("Never".to_string()),
            service_account_name: config.service_account.clone(),
            node_selector: (!config.node_selector.is_empty())
                .then(|| config.node_selector.clone()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn resources(cpu: &str, memory: &str) -> ResourceRequirements {
    ResourceRequirements {
        requests: Some(
            [
                ("cpu".to_string(), Quantity(cpu.to_string())),
                ("memory".to_string(), Quantity(memory.to_string())),
            ]
            .into_iter()
            .collect(),
        ),
        limits: Some([("memory".to_string(), Quantity(memory.to_string()))].into_iter().collect()),
        ..Default::default()
    }
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar { name: name.to_string(), value: Some(value.to_string()), ..Default::default() }
}

#[cfg(test)]
#[path = "pod_tests.rs"]
mod tests;
