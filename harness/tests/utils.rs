// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use case_harness::utils;
use case_harness::utils::writer::Writer;
use case_harness::{CaseResult, Callback, Failure, Listener, RunResults, Value};

#[non_exhaustive]
pub struct StatusCode;

const HARNESS_TEST_APP_NAME: &str = "case-harness-test";

#[allow(dead_code)]
impl StatusCode {
    pub const SUCCESS: i32 = 0;
    pub const INTERNAL_FAILURE: i32 = -1;
    pub const PREPROCESSOR_ERROR: i32 = -3;
    pub const FAILURE: i32 = 19;
    pub const ERROR: i32 = 5;
}

/// Shared, ordered trace of what the bodies under test did.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct Log {
    entries: Rc<RefCell<Vec<String>>>,
}

#[allow(dead_code)]
impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries.borrow().iter().filter(|e| *e == entry).count()
    }

    /// A body that appends `entry` and succeeds.
    pub fn record(&self, entry: &str) -> Callback {
        let log = self.clone();
        let entry = entry.to_string();
        Callback::sync(move || {
            log.push(entry.clone());
            Ok(Value::Unit)
        })
    }

    /// A body that appends `entry` and fails.
    pub fn record_failure(&self, entry: &str) -> Callback {
        let log = self.clone();
        let entry = entry.to_string();
        Callback::sync(move || {
            log.push(entry.clone());
            Err(Failure::raised(format!("{entry} failed")))
        })
    }
}

/// Listener keeping every event it receives.
#[allow(dead_code)]
#[derive(Default)]
pub struct Recorder {
    pub finished: RefCell<Vec<CaseResult>>,
    pub files: RefCell<Vec<String>>,
    pub runs: RefCell<Vec<RunResults>>,
}

impl Listener for Recorder {
    fn case_finished(&self, result: &CaseResult) {
        self.finished.borrow_mut().push(result.clone());
    }

    fn run_finished(&self, results: &RunResults) {
        self.runs.borrow_mut().push(results.clone());
    }

    fn file_changed(&self, file: &str) {
        self.files.borrow_mut().push(file.to_string());
    }
}

#[allow(dead_code)]
pub fn titles(results: &RunResults) -> Vec<String> {
    results
        .test_results
        .iter()
        .map(CaseResult::full_title)
        .collect()
}

#[allow(dead_code)]
pub fn compare_write_buffer_with_string(expected_output: &str, actual_output_writer: Writer) {
    let actual_output = actual_output_writer.stripped().unwrap();
    pretty_assertions::assert_eq!(expected_output, actual_output)
}

#[allow(dead_code)]
pub trait CommandTestRunner {
    fn build_args(&self) -> Vec<String>;

    fn run(&self, writer: &mut Writer) -> i32 {
        let mut app = clap::Command::new(HARNESS_TEST_APP_NAME);

        let command_options = std::iter::once(String::from(HARNESS_TEST_APP_NAME))
            .chain(self.build_args())
            .collect::<Vec<String>>();

        let commands = utils::get_harness_commands();
        let mappings = commands
            .iter()
            .map(|command| (command.name(), command.as_ref()))
            .collect::<HashMap<_, _>>();

        for each in &commands {
            app = app.subcommand(each.command());
        }

        let app = app.get_matches_from(command_options);

        match app.subcommand() {
            Some((name, value)) => match mappings.get(name) {
                Some(command) => match command.execute(value, writer) {
                    Err(e) => {
                        writer
                            .write_err(format!("Error occurred {e}"))
                            .expect("failed to write to stderr");
                        StatusCode::INTERNAL_FAILURE
                    }
                    Ok(code) => code,
                },
                None => StatusCode::PREPROCESSOR_ERROR,
            },
            None => StatusCode::PREPROCESSOR_ERROR,
        }
    }
}

#[macro_export]
macro_rules! assert_output_from_str_eq {
    ($expected_output: expr, $actual_output_writer: expr) => {
        $crate::utils::compare_write_buffer_with_string($expected_output, $actual_output_writer)
    };
}
