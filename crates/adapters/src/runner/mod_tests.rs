// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kr_core::{DescribeTopicRequest, ListTopicsResponse, RunnerErrorKind};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Runner returning canned responses and recording what it was asked.
struct CannedRunner {
    response: String,
    calls: Mutex<Vec<(String, String)>>,
}

impl CannedRunner {
    fn new(response: &str) -> Self {
        Self { response: response.to_string(), calls: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl Runner for CannedRunner {
    fn name(&self) -> &str {
        "canned"
    }

    async fn launch(&self, function: &str, payload: &str) -> Result<String, RunnerError> {
        self.calls.lock().push((function.to_string(), payload.to_string()));
        Ok(self.response.clone())
    }
}

#[tokio::test]
async fn call_sends_function_name_and_encoded_request() {
    let runner = CannedRunner::new(r#"{"topics":[{"name":"orders","partitions":3}]}"#);
    let response: ListTopicsResponse =
        runner.call(Function::ListTopics, &kr_core::ListTopicsRequest::default()).await.unwrap();

    assert_eq!(response.topics[0].name, "orders");
    let calls = runner.calls.lock();
    assert_eq!(calls[0].0, "list_topics");
    assert_eq!(calls[0].1, r#"{"include_internal":false}"#);
}

#[tokio::test]
async fn call_reports_unparseable_response_as_transport_error() {
    let runner = CannedRunner::new("not json");
    let err = runner
        .call::<_, ListTopicsResponse>(
            Function::DescribeTopic,
            &DescribeTopicRequest { topic: "t".into() },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind, RunnerErrorKind::Transport);
    assert_eq!(err.runner, "canned");
}

#[tokio::test]
async fn call_rejects_unencodable_request_before_dispatch() {
    let runner = CannedRunner::new("{}");
    // JSON object keys must be strings
    let request: HashMap<Vec<u8>, u8> = [(vec![1u8], 1u8)].into_iter().collect();
    let err = runner.call::<_, serde_json::Value>(Function::Poll, &request).await.unwrap_err();

    assert_eq!(err.kind, RunnerErrorKind::Argument);
    assert!(runner.calls.lock().is_empty());
}

#[tokio::test]
async fn call_works_through_trait_object() {
    let runner: std::sync::Arc<dyn Runner> = std::sync::Arc::new(CannedRunner::new("[]"));
    let topics: Vec<String> = runner.call(Function::ListTopics, &()).await.unwrap();
    assert!(topics.is_empty());
}
