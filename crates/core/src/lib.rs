// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kr-core: wire types shared by the controller and the broker functions

pub mod macros;

pub mod call;
pub mod failure;
pub mod function;
pub mod handler;
pub mod poll;

pub use call::CallEnvelope;
pub use failure::{FailureEnvelope, RunnerError, RunnerErrorKind};
pub use function::{
    DescribeTopicRequest, Function, ListTopicsRequest, ListTopicsResponse, PartitionInfo,
    ProduceRequest, ProduceResponse, QueryOffsetsRequest, QueryOffsetsResponse,
    TopicDescription, TopicSummary, UnknownFunction,
};
pub use handler::FunctionHandler;
pub use poll::{PartitionOffset, PartitionProgress, PollConfig, PollResponse, Record, Subscription};
