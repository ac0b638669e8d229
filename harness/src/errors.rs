// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::any::Any;
use std::fmt::Display;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::runner::hooks::HookPhase;

/// Errors surfaced to the caller of the harness: misuse of the API and
/// structural failures that abort a whole run.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Cases, groups and hooks cannot be registered while a case is executing")]
    RegistrationDuringCase,
    #[error("A run is already in progress")]
    AlreadyRunning,
    #[error("There is no run in progress")]
    NotRunning,
    #[error("Case information is only available inside a case")]
    NotInCase,
    #[error("Group `{}` failed: {}", .title_chain.join(" > "), .failure)]
    GroupFailed {
        title_chain: Vec<String>,
        failure: Failure,
    },
    #[error("{phase} hook failed: {failure}")]
    HookFailed { phase: HookPhase, failure: Failure },
    #[error("Invalid configuration {0}")]
    ConfigError(String),
    #[error("I/O error when reading {0}")]
    IoError(#[from] std::io::Error),
    #[error("Error parsing JSON {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Error parsing YAML {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("Output is not valid UTF-8 {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
    #[error("Error writing XML report {0}")]
    XmlError(#[from] quick_xml::Error),
}

/// The failure of a single unit of work (case body, hook, group body or
/// listener). This is what "throwing" means inside the harness.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum Failure {
    #[error("{0}")]
    Raised(String),
    #[error("panicked at `{0}`")]
    Panicked(String),
    #[error(transparent)]
    Timeout(#[from] TimeoutFailure),
}

/// Produced only by the timeout racer. `elapsed_ms` is wall-clock time and
/// can exceed `timeout_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("Timed out after {elapsed_ms}ms, the limit is {timeout_ms}ms")]
pub struct TimeoutFailure {
    pub elapsed_ms: u64,
    pub timeout_ms: i64,
}

impl TimeoutFailure {
    pub fn new(elapsed: Duration, timeout_ms: i64) -> Self {
        TimeoutFailure {
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            timeout_ms,
        }
    }
}

impl Failure {
    pub fn raised(message: impl Display) -> Self {
        Failure::Raised(message.to_string())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Failure::Timeout(_))
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast_ref::<&str>() {
            Some(msg) => msg.to_string(),
            None => match payload.downcast_ref::<String>() {
                Some(msg) => msg.clone(),
                None => String::from("Box<dyn Any>"),
            },
        };
        Failure::Panicked(message)
    }
}

impl From<HarnessError> for Failure {
    fn from(err: HarnessError) -> Self {
        Failure::Raised(err.to_string())
    }
}
