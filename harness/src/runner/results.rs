// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};
use std::time::Duration;

use colored::Colorize;
use serde::{Serialize, Serializer};

use crate::errors::Failure;
use crate::runner::normalize::Settled;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Fail,
    Timeout,
    Skipped,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "{}", "PASS".green())?,
            Outcome::Fail => write!(f, "{}", "FAIL".red())?,
            Outcome::Timeout => write!(f, "{}", "TIMEOUT".red())?,
            Outcome::Skipped => write!(f, "{}", "SKIP".yellow())?,
        }
        Ok(())
    }
}

/// Identity of the case currently executing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseInfo {
    pub title: String,
    pub title_chain: Vec<String>,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    pub outcome: Outcome,
    pub title: String,
    pub title_chain: Vec<String>,
    pub file: String,
    #[serde(rename = "elapsedMs", serialize_with = "as_millis")]
    pub elapsed: Duration,
    pub error: Option<Failure>,
}

impl CaseResult {
    pub(crate) fn skipped(info: &CaseInfo) -> Self {
        CaseResult {
            outcome: Outcome::Skipped,
            title: info.title.clone(),
            title_chain: info.title_chain.clone(),
            file: info.file.clone(),
            elapsed: Duration::ZERO,
            error: None,
        }
    }

    /// Scores a settled case body. Timeout failures are told apart from
    /// ordinary ones.
    pub(crate) fn settled(info: &CaseInfo, settled: Settled, elapsed: Duration) -> Self {
        let (outcome, error) = match settled {
            Ok(_) => (Outcome::Success, None),
            Err(failure) if failure.is_timeout() => (Outcome::Timeout, Some(failure)),
            Err(failure) => (Outcome::Fail, Some(failure)),
        };
        CaseResult {
            outcome,
            title: info.title.clone(),
            title_chain: info.title_chain.clone(),
            file: info.file.clone(),
            elapsed,
            error,
        }
    }

    /// `title_chain` and `title` joined for display.
    pub fn full_title(&self) -> String {
        let mut parts = self.title_chain.clone();
        parts.push(self.title.clone());
        parts.join(" > ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResults {
    #[serde(rename = "elapsedMs", serialize_with = "as_millis")]
    pub elapsed: Duration,
    pub total_tests: usize,
    pub total_successes: usize,
    pub total_failures: usize,
    pub total_timeouts: usize,
    pub total_skipped: usize,
    pub test_results: Vec<CaseResult>,
}

impl RunResults {
    /// Counts and keeps a finalized result. Skipped cases are kept but not
    /// counted as tests.
    pub(crate) fn record(&mut self, result: CaseResult) {
        match result.outcome {
            Outcome::Success => self.total_successes += 1,
            Outcome::Fail => self.total_failures += 1,
            Outcome::Timeout => self.total_timeouts += 1,
            Outcome::Skipped => self.total_skipped += 1,
        }
        if result.outcome != Outcome::Skipped {
            self.total_tests += 1;
        }
        self.test_results.push(result);
    }

    pub fn has_failures(&self) -> bool {
        self.total_failures + self.total_timeouts > 0
    }
}

fn as_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64() * 1000.0)
}
