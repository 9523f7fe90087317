// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kr-worker: the function side of every runner
//!
//! A [`Dispatcher`] decodes a named call, runs it against a [`Broker`], and
//! encodes the response. The local runner calls it in-process; the
//! `kr-worker` binary wraps it in the container contract used by the
//! orchestrated backend.

pub mod broker;
pub mod dispatch;
pub mod error;
pub mod execute;
pub mod logging;

pub use broker::memory::{MemoryBroker, TopicFixture};
pub use broker::Broker;
pub use dispatch::Dispatcher;
pub use error::{BrokerError, FunctionError};
pub use execute::{execute_envelope, Outcome};

#[cfg(feature = "kafka")]
pub use broker::kafka::KafkaBroker;
