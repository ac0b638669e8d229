// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use clap::{Arg, ArgMatches};
use log::{debug, info};

use crate::command::Command;
use crate::commands::{
    config_args, resolve_config, self_check, APP_NAME, ERROR_STATUS_CODE, FAILURE_STATUS_CODE,
    OUTPUT_FORMAT, RUN, SUCCESS_STATUS_CODE,
};
use crate::errors::HarnessError;
use crate::reporters::{OutputFormat, Reporter};
use crate::runner::Harness;
use crate::utils::writer::Writer;

#[derive(Clone, Copy, Eq, PartialEq, Default)]
pub struct Run {}

impl Run {
    pub fn new() -> Self {
        Run {}
    }
}

impl Command for Run {
    fn name(&self) -> &'static str {
        RUN
    }

    fn command(&self) -> clap::Command {
        config_args(clap::Command::new(RUN))
            .about(
                r#"Runs the built-in self-check suite, exercising groups, hooks,
focus and skip markers and timeouts, and reports the results.
"#,
            )
            .arg(
                Arg::new(OUTPUT_FORMAT.0)
                    .long(OUTPUT_FORMAT.0)
                    .short(OUTPUT_FORMAT.1)
                    .value_parser(OutputFormat::VALUES)
                    .default_value("console")
                    .help("Specify the format in which the results are written"),
            )
    }

    fn execute(&self, args: &ArgMatches, writer: &mut Writer) -> Result<i32, HarnessError> {
        let config = resolve_config(args)?;
        let format = match args.get_one::<String>(OUTPUT_FORMAT.0) {
            Some(format) => format.parse::<OutputFormat>()?,
            None => OutputFormat::default(),
        };
        debug!("running self-check suite with {config:?}, reporting as {format}");

        let harness = Harness::new(config);
        self_check::register(&harness)?;

        let reporter = Reporter::new(format, Writer::in_memory(), APP_NAME);
        let id = harness.add_listener(reporter.listener());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let settled = runtime.block_on(harness.run()?);
        harness.remove_listener(id);

        let report = reporter.into_writer()?.into_string()?;
        write!(writer, "{report}")?;

        match settled {
            Ok(results) => {
                info!(
                    "{} of {} case(s) succeeded",
                    results.total_successes, results.total_tests
                );
                Ok(match results.has_failures() {
                    true => FAILURE_STATUS_CODE,
                    false => SUCCESS_STATUS_CODE,
                })
            }
            Err(e) => {
                writer.write_err(format!("Error occurred {e}"))?;
                Ok(ERROR_STATUS_CODE)
            }
        }
    }
}
