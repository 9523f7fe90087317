// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kr_core::RunnerErrorKind;

fn runner(invoker: &FakeInvoker) -> ServerlessRunner<FakeInvoker> {
    ServerlessRunner::new(invoker.clone(), "kr-worker")
}

#[tokio::test]
async fn request_body_is_call_envelope() {
    let invoker = FakeInvoker::new();
    invoker.respond(r#"{"topics":[]}"#);

    let response = runner(&invoker).launch("list_topics", "{}").await.unwrap();

    assert_eq!(response, r#"{"topics":[]}"#);
    let (function_name, body) = &invoker.requests()[0];
    assert_eq!(function_name, "kr-worker");
    assert_eq!(CallEnvelope::from_json(body).unwrap(), CallEnvelope::new("list_topics", "{}"));
}

#[tokio::test]
async fn error_flag_reconstructs_failure_chain() {
    let invoker = FakeInvoker::new();
    invoker.fail(
        "Unhandled",
        r#"{"errorMessage":"poll failed","errorType":"FunctionError","stackTrace":["a","b"],
            "cause":{"errorMessage":"no such topic","errorType":"BrokerError","stackTrace":[],"cause":null}}"#,
    );

    let err = runner(&invoker).launch("poll", "{}").await.unwrap_err();

    assert_eq!(err.kind, RunnerErrorKind::RemoteExecution);
    assert_eq!(err.runner, "lambda");
    assert_eq!(err.depth(), 2);
    assert_eq!(err.stack_trace, vec!["a", "b"]);
    assert_eq!(err.cause.as_ref().unwrap().error_type.as_deref(), Some("BrokerError"));
}

#[tokio::test]
async fn envelope_shaped_success_payload_is_not_treated_as_failure() {
    // Only the out-of-band flag marks failure, never the payload shape
    let invoker = FakeInvoker::new();
    invoker.respond(r#"{"errorMessage":"just data"}"#);

    let response = runner(&invoker).launch("poll", "{}").await.unwrap();
    assert_eq!(response, r#"{"errorMessage":"just data"}"#);
}

#[tokio::test]
async fn error_flag_with_unparseable_body_degrades_to_generic_failure() {
    let invoker = FakeInvoker::new();
    invoker.fail("Unhandled", "Runtime exited with error: signal: killed");

    let err = runner(&invoker).launch("poll", "{}").await.unwrap_err();

    assert_eq!(err.kind, RunnerErrorKind::RemoteExecution);
    assert_eq!(err.error_type.as_deref(), Some("Unhandled"));
    assert!(err.message.contains("signal: killed"));
}

#[tokio::test]
async fn invocation_failure_is_transport_error() {
    let invoker = FakeInvoker::new();
    invoker.error("throttled");

    let err = runner(&invoker).launch("poll", "{}").await.unwrap_err();

    assert_eq!(err.kind, RunnerErrorKind::Transport);
    assert_eq!(err.depth(), 1);
    assert!(err.message.contains("throttled"));
}

#[tokio::test(start_paused = true)]
async fn unresponsive_invocation_times_out() {
    let invoker = FakeInvoker::new();
    let runner = runner(&invoker).timeout(Duration::from_secs(15));
    let start = tokio::time::Instant::now();

    let err = runner.launch("poll", "{}").await.unwrap_err();

    assert_eq!(err.kind, RunnerErrorKind::Timeout);
    assert_eq!(start.elapsed(), Duration::from_secs(15));
}
