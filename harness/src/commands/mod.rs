// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use clap::ArgMatches;

use crate::config::HarnessConfig;
use crate::errors::HarnessError;

pub mod run;
pub mod self_check;
pub mod show_config;

//
// Constants
//
// Application metadata
pub const APP_NAME: &str = "case-harness";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
// Commands
pub const RUN: &str = "run";
pub const SHOW_CONFIG: &str = "show-config";
// Arguments shared by run and show-config
pub const CONFIG: (&str, char) = ("config", 'c');
pub const TIMEOUT: (&str, char) = ("timeout", 't');
pub const STOP_ON_FIRST_FAIL: (&str, char) = ("stop-on-first-fail", 's');
// Arguments for run, show-config
pub const OUTPUT_FORMAT: (&str, char) = ("output-format", 'o');

pub const FAILURE_STATUS_CODE: i32 = 19;
pub const SUCCESS_STATUS_CODE: i32 = 0;
pub const ERROR_STATUS_CODE: i32 = 5;

/// Builds the effective configuration: the config file if one was given,
/// then the command line flags on top of it.
pub(crate) fn resolve_config(args: &ArgMatches) -> Result<HarnessConfig, HarnessError> {
    let mut config = match args.get_one::<String>(CONFIG.0) {
        Some(path) => HarnessConfig::load(Path::new(path))?,
        None => HarnessConfig::default(),
    };
    if let Some(timeout_ms) = args.get_one::<i64>(TIMEOUT.0) {
        config = config.with_timeout_ms(*timeout_ms);
    }
    if args.get_flag(STOP_ON_FIRST_FAIL.0) {
        config = config.with_stop_on_first_fail(true);
    }
    Ok(config)
}

pub(crate) fn config_args(command: clap::Command) -> clap::Command {
    command
        .arg(
            clap::Arg::new(CONFIG.0)
                .long(CONFIG.0)
                .short(CONFIG.1)
                .help("Provide a configuration file in JSON or YAML"),
        )
        .arg(
            clap::Arg::new(TIMEOUT.0)
                .long(TIMEOUT.0)
                .short(TIMEOUT.1)
                .value_parser(clap::value_parser!(i64))
                .allow_negative_numbers(true)
                .help("Timeout in milliseconds for every phase, 0 or less disables it"),
        )
        .arg(
            clap::Arg::new(STOP_ON_FIRST_FAIL.0)
                .long(STOP_ON_FIRST_FAIL.0)
                .short(STOP_ON_FIRST_FAIL.1)
                .action(clap::ArgAction::SetTrue)
                .help("Stop the run after the first case that does not succeed"),
        )
}
