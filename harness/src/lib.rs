// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub mod command;
pub mod commands;
pub mod config;
pub mod errors;
pub mod reporters;
pub mod runner;
pub mod utils;

pub use crate::config::{HarnessConfig, PhaseTimeouts};
pub use crate::errors::{Failure, HarnessError, TimeoutFailure};
pub use crate::runner::events::{Listener, ListenerId};
pub use crate::runner::normalize::{Callback, Done, Settled, Value};
pub use crate::runner::results::{CaseInfo, CaseResult, Outcome, RunResults};
pub use crate::runner::scope::CaseOptions;
pub use crate::runner::Harness;
