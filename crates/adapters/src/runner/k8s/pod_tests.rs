// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn params(config: &KubernetesConfig) -> UnitParams<'_> {
    UnitParams {
        name: "kr-poll-0123456789ab".to_string(),
        runner_id: "r1",
        function: "poll",
        args: vec![r#"{"function":"poll","payload":"{}"}"#.to_string(), config.output_path.clone()],
        config,
    }
}

fn container<'a>(pod: &'a Pod, name: &str) -> &'a Container {
    pod.spec.as_ref().unwrap().containers.iter().find(|c| c.name == name).unwrap()
}

#[test]
fn unit_carries_owner_runner_and_function_labels() {
    let config = KubernetesConfig::default();
    let pod = build_pod(&params(&config));
    let labels = pod.metadata.labels.unwrap();

    assert_eq!(labels.get(OWNER_LABEL).map(String::as_str), Some(OWNER_VALUE));
    assert_eq!(labels.get(RUNNER_ID_LABEL).map(String::as_str), Some("r1"));
    assert_eq!(labels.get(FUNCTION_LABEL).map(String::as_str), Some("poll"));
    assert_eq!(pod.metadata.name.as_deref(), Some("kr-poll-0123456789ab"));
    assert_eq!(pod.metadata.namespace.as_deref(), Some("default"));
}

#[test]
fn call_container_gets_envelope_and_output_path() {
    let config = KubernetesConfig::default().image("registry.local/kr-worker:1.2");
    let pod = build_pod(&params(&config));
    let call = container(&pod, CALL_CONTAINER);

    assert_eq!(call.image.as_deref(), Some("registry.local/kr-worker:1.2"));
    let args = call.args.as_ref().unwrap();
    assert_eq!(args.len(), 2);
    assert_eq!(args[1], "/kr/output/result.json");

    let env = call.env.as_ref().unwrap();
    assert!(env.iter().any(|e| e.name == "KR_OUTPUT"
        && e.value.as_deref() == Some("/kr/output/result.json")));
}

#[test]
fn both_containers_share_the_output_directory() {
    let config = KubernetesConfig::default().output_path("/data/out/response.json");
    let pod = build_pod(&params(&config));

    for name in [CALL_CONTAINER, OUTPUT_CONTAINER] {
        let mounts = container(&pod, name).volume_mounts.as_ref().unwrap();
        assert_eq!(mounts[0].mount_path, "/data/out");
    }
    let volumes = pod.spec.as_ref().unwrap().volumes.as_ref().unwrap();
    assert!(volumes[0].empty_dir.is_some());
}

#[test]
fn resources_follow_config() {
    let config = KubernetesConfig::default().cpu("500m").memory("1Gi");
    let pod = build_pod(&params(&config));
    let resources = container(&pod, CALL_CONTAINER).resources.as_ref().unwrap();

    let requests = resources.requests.as_ref().unwrap();
    assert_eq!(requests["cpu"].0, "500m");
    assert_eq!(requests["memory"].0, "1Gi");
    assert_eq!(resources.limits.as_ref().unwrap()["memory"].0, "1Gi");
}

#[test]
fn sidecar_lingers_after_printing() {
    let config = KubernetesConfig { output_linger_secs: 42, ..Default::default() };
    let pod = build_pod(&params(&config));
    let command = container(&pod, OUTPUT_CONTAINER).command.as_ref().unwrap();

    assert_eq!(command[..2], ["sh".to_string(), "-c".to_string()]);
    assert!(command[2].contains("cat \"$KR_OUTPUT\""));
    assert!(command[2].ends_with("sleep 42"));
}

#[test]
fn pod_never_restarts_and_uses_service_account() {
    let mut config = KubernetesConfig::default().service_account("kr");
    config.node_selector.insert("pool".into(), "batch".into());
    let pod = build_pod(&params(&config));
    let spec = pod.spec.unwrap();

    assert_eq!(spec.restart_policy.as_deref(), Some("Never"));
    assert_eq!(spec.service_account_name.as_deref(), Some("kr"));
    assert_eq!(spec.node_selector.unwrap()["pool"], "batch");
}

#[test]
fn empty_node_selector_is_omitted() {
    let config = KubernetesConfig::default();
    let pod = build_pod(&params(&config));
    assert!(pod.spec.unwrap().node_selector.is_none());
}

#[test]
fn selector_scopes_to_one_runner() {
    assert_eq!(runner_selector("abc"), "kr.dev/owner=kr-runner,kr.dev/runner-id=abc");
}

#[test]
fn configured_labels_cannot_override_reserved_ones() {
    let mut config = KubernetesConfig::default();
    config.labels.insert(RUNNER_ID_LABEL.to_string(), "other".to_string());
    config.labels.insert(OWNER_LABEL.to_string(), "someone".to_string());
    config.labels.insert("team".to_string(), "data".to_string());
    let pod = build_pod(&params(&config));
    let labels = pod.metadata.labels.unwrap();

    assert_eq!(labels.get(RUNNER_ID_LABEL).map(String::as_str), Some("r1"));
    assert_eq!(labels.get(OWNER_LABEL).map(String::as_str), Some(OWNER_VALUE));
    assert_eq!(labels.get("team").map(String::as_str), Some("data"));
}
