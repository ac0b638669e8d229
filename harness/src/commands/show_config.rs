// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use clap::{Arg, ArgMatches};
use serde::Serialize;

use crate::command::Command;
use crate::commands::{config_args, resolve_config, OUTPUT_FORMAT, SHOW_CONFIG, SUCCESS_STATUS_CODE};
use crate::config::PhaseTimeouts;
use crate::errors::HarnessError;
use crate::utils::writer::Writer;

#[derive(Clone, Copy, Eq, PartialEq, Default)]
pub struct ShowConfig {}

impl ShowConfig {
    pub fn new() -> Self {
        ShowConfig {}
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EffectiveConfig {
    timeout_ms: PhaseTimeouts,
    stop_on_first_fail: bool,
}

impl Command for ShowConfig {
    fn name(&self) -> &'static str {
        SHOW_CONFIG
    }

    fn command(&self) -> clap::Command {
        config_args(clap::Command::new(SHOW_CONFIG))
            .about("Prints the effective per-phase timeouts and run settings")
            .arg(
                Arg::new(OUTPUT_FORMAT.0)
                    .long(OUTPUT_FORMAT.0)
                    .short(OUTPUT_FORMAT.1)
                    .value_parser(["json", "yaml"])
                    .default_value("json")
                    .help("Specify the format in which the configuration is written"),
            )
    }

    fn execute(&self, args: &ArgMatches, writer: &mut Writer) -> Result<i32, HarnessError> {
        let config = resolve_config(args)?;
        let effective = EffectiveConfig {
            timeout_ms: config.phase_timeouts(),
            stop_on_first_fail: config.stop_on_first_fail,
        };

        match args.get_one::<String>(OUTPUT_FORMAT.0).map(String::as_str) {
            Some("yaml") => serde_yaml::to_writer(&mut *writer, &effective)?,
            _ => {
                serde_json::to_writer_pretty(&mut *writer, &effective)?;
                writeln!(writer)?;
            }
        }
        Ok(SUCCESS_STATUS_CODE)
    }
}
