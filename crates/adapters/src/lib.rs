// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kr-adapters: execution backends behind the [`Runner`] contract

pub mod runner;

pub use runner::k8s::{KubePodClient, KubernetesConfig, KubernetesRunner, PodClient};
pub use runner::local::LocalRunner;
pub use runner::serverless::{FunctionInvoker, InvokeError, Invocation, ServerlessRunner};
pub use runner::{Runner, RunnerExt};

#[cfg(feature = "lambda")]
pub use runner::serverless::LambdaInvoker;

#[cfg(any(test, feature = "test-support"))]
pub use runner::k8s::FakePodClient;
#[cfg(any(test, feature = "test-support"))]
pub use runner::serverless::FakeInvoker;
