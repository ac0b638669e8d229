// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::process::exit;

use case_harness::command::Command;
use case_harness::commands::{APP_NAME, APP_VERSION, ERROR_STATUS_CODE};
use case_harness::errors::HarnessError;
use case_harness::utils::get_harness_commands;
use case_harness::utils::writer::{WriteBuffer::Stderr, WriteBuffer::Stdout, Writer};

fn main() -> Result<(), HarnessError> {
    env_logger::init();

    let mut app = clap::Command::new(APP_NAME)
        .version(APP_VERSION)
        .about(
            r#"
  A unit-test execution harness. Groups register their cases lazily, hooks
  run per scope, every phase is bounded by a timeout and results are
  streamed to console, JSON, YAML or JUnit reporters."#,
        )
        .arg_required_else_help(true);

    let commands: Vec<Box<dyn Command>> = get_harness_commands();
    let mappings = commands
        .iter()
        .map(|command| (command.name(), command.as_ref()))
        .collect::<HashMap<&str, &dyn Command>>();

    for each in &commands {
        app = app.subcommand(each.command());
    }

    let help = app.render_usage();
    let app = app.get_matches();

    match app.subcommand() {
        Some((name, value)) => match mappings.get(name) {
            Some(command) => {
                let mut output_writer = Writer::new_with_err(
                    Stdout(std::io::stdout()),
                    Stderr(std::io::stderr()),
                );
                match command.execute(value, &mut output_writer) {
                    Err(e) => {
                        output_writer.write_err(format!("Error occurred {e}"))?;
                        exit(ERROR_STATUS_CODE);
                    }
                    Ok(code) => exit(code),
                }
            }
            None => println!("{help}"),
        },
        None => println!("{help}"),
    }

    Ok(())
}
