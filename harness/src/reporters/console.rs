// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::fmt::Display;
use std::io::Write;

use colored::Colorize;
use log::error;

use crate::runner::events::Listener;
use crate::runner::results::{CaseResult, RunResults};
use crate::utils::writer::Writer;

/// Human readable progress: group headers, one line per case and a summary.
pub struct ConsoleReporter {
    writer: RefCell<Writer>,
    printed_chain: RefCell<Vec<String>>,
}

impl ConsoleReporter {
    pub fn new(writer: Writer) -> Self {
        ConsoleReporter {
            writer: RefCell::new(writer),
            printed_chain: RefCell::new(vec![]),
        }
    }

    pub fn into_writer(self) -> Writer {
        self.writer.into_inner()
    }

    fn line(&self, text: impl Display) {
        if let Err(e) = writeln!(self.writer.borrow_mut(), "{text}") {
            error!("unable to write console report: {e}");
        }
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

impl Listener for ConsoleReporter {
    fn file_changed(&self, file: &str) {
        self.printed_chain.borrow_mut().clear();
        self.line(format!("# {}", file.underline()));
    }

    fn case_finished(&self, result: &CaseResult) {
        let common = {
            let printed = self.printed_chain.borrow();
            printed
                .iter()
                .zip(&result.title_chain)
                .take_while(|(printed, current)| printed == current)
                .count()
        };
        for (depth, title) in result.title_chain.iter().enumerate().skip(common) {
            self.line(format!("{}{}", indent(depth), title.bold()));
        }
        *self.printed_chain.borrow_mut() = result.title_chain.clone();

        let depth = result.title_chain.len();
        self.line(format!("{}{} {}", indent(depth), result.outcome, result.title));
        if let Some(error) = &result.error {
            self.line(format!("{}  {}", indent(depth), error.to_string().dimmed()));
        }
    }

    fn run_finished(&self, results: &RunResults) {
        self.line("");
        self.line(format!(
            "{} tests, {} passed, {} failed, {} timed out, {} skipped",
            results.total_tests,
            results.total_successes.to_string().green(),
            results.total_failures.to_string().red(),
            results.total_timeouts.to_string().red(),
            results.total_skipped.to_string().yellow(),
        ));
    }
}
