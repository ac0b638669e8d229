// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::HarnessError;
use crate::runner::hooks::HookPhase;

pub const DEFAULT_TIMEOUT_MS: i64 = 100;

pub(crate) const JSON_EXTENSIONS: [&str; 2] = ["json", "jsn"];
pub(crate) const YAML_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Settings handed to [`crate::Harness::new`]. Every field is optional in
/// the serialized form and missing ones fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub timeout_ms: TimeoutSetting,
    pub stop_on_first_fail: bool,
}

/// `timeoutMs` is either one number for every phase or a per-phase object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TimeoutSetting {
    Uniform(i64),
    PerPhase(PartialPhaseTimeouts),
}

impl Default for TimeoutSetting {
    fn default() -> Self {
        TimeoutSetting::Uniform(DEFAULT_TIMEOUT_MS)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct PartialPhaseTimeouts {
    pub case: Option<i64>,
    pub setup_once: Option<i64>,
    pub setup_each: Option<i64>,
    pub teardown_once: Option<i64>,
    pub teardown_each: Option<i64>,
}

/// Fully resolved timeouts in milliseconds. A value `<= 0` disables the
/// timeout for that phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTimeouts {
    pub case: i64,
    pub setup_once: i64,
    pub setup_each: i64,
    pub teardown_once: i64,
    pub teardown_each: i64,
}

impl Default for PhaseTimeouts {
    fn default() -> Self {
        PhaseTimeouts::uniform(DEFAULT_TIMEOUT_MS)
    }
}

impl PhaseTimeouts {
    pub fn uniform(timeout_ms: i64) -> Self {
        PhaseTimeouts {
            case: timeout_ms,
            setup_once: timeout_ms,
            setup_each: timeout_ms,
            teardown_once: timeout_ms,
            teardown_each: timeout_ms,
        }
    }

    pub fn for_hook(&self, phase: HookPhase) -> i64 {
        match phase {
            HookPhase::SetupOnce => self.setup_once,
            HookPhase::SetupEach => self.setup_each,
            HookPhase::TeardownEach => self.teardown_each,
            HookPhase::TeardownOnce => self.teardown_once,
        }
    }
}

impl HarnessConfig {
    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = TimeoutSetting::Uniform(timeout_ms);
        self
    }

    pub fn with_phase_timeouts(mut self, timeouts: PartialPhaseTimeouts) -> Self {
        self.timeout_ms = TimeoutSetting::PerPhase(timeouts);
        self
    }

    pub fn with_stop_on_first_fail(mut self, stop_on_first_fail: bool) -> Self {
        self.stop_on_first_fail = stop_on_first_fail;
        self
    }

    pub fn phase_timeouts(&self) -> PhaseTimeouts {
        match self.timeout_ms {
            TimeoutSetting::Uniform(timeout_ms) => PhaseTimeouts::uniform(timeout_ms),
            TimeoutSetting::PerPhase(partial) => {
                let defaults = PhaseTimeouts::default();
                PhaseTimeouts {
                    case: partial.case.unwrap_or(defaults.case),
                    setup_once: partial.setup_once.unwrap_or(defaults.setup_once),
                    setup_each: partial.setup_each.unwrap_or(defaults.setup_each),
                    teardown_once: partial.teardown_once.unwrap_or(defaults.teardown_once),
                    teardown_each: partial.teardown_each.unwrap_or(defaults.teardown_each),
                }
            }
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, HarnessError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, HarnessError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Reads a configuration file. The extension picks the format; files
    /// without a known extension are tried as JSON first, then YAML.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        if !path.exists() {
            return Err(HarnessError::ConfigError(format!(
                "the path `{}` does not exist",
                path.display()
            )));
        }

        let mut content = String::new();
        File::open(path)?.read_to_string(&mut content)?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if JSON_EXTENSIONS.contains(&extension.as_str()) {
            Self::from_json_str(&content)
        } else if YAML_EXTENSIONS.contains(&extension.as_str()) {
            Self::from_yaml_str(&content)
        } else {
            match Self::from_json_str(&content) {
                Ok(config) => Ok(config),
                Err(_) => Self::from_yaml_str(&content).map_err(|e| {
                    HarnessError::ConfigError(format!(
                        "unable to read {} as JSON or YAML, Error {e}",
                        path.display()
                    ))
                }),
            }
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
