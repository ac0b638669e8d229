// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::time::Duration;

use indexmap::IndexMap;
use log::error;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::errors::HarnessError;
use crate::runner::events::Listener;
use crate::runner::results::{CaseResult, Outcome, RunResults};
use crate::utils::writer::Writer;

const ROOT_SUITE: &str = "(root)";

/// Writes a JUnit XML document once the run has finished. Cases are
/// grouped into one `testsuite` per top-level group.
pub struct JunitReporter {
    writer: RefCell<Writer>,
    name: String,
}

struct TestSuite<'results> {
    name: &'results str,
    cases: Vec<&'results CaseResult>,
}

impl<'results> TestSuite<'results> {
    fn count(&self, outcomes: &[Outcome]) -> usize {
        self.cases
            .iter()
            .filter(|case| outcomes.contains(&case.outcome))
            .count()
    }

    fn time(&self) -> Duration {
        self.cases.iter().map(|case| case.elapsed).sum()
    }
}

impl JunitReporter {
    pub fn new(writer: Writer, name: impl Into<String>) -> Self {
        JunitReporter {
            writer: RefCell::new(writer),
            name: name.into(),
        }
    }

    pub fn into_writer(self) -> Writer {
        self.writer.into_inner()
    }

    fn suites(results: &RunResults) -> Vec<TestSuite<'_>> {
        let mut by_suite: IndexMap<&str, Vec<&CaseResult>> = IndexMap::new();
        for result in &results.test_results {
            let name = result
                .title_chain
                .first()
                .map_or(ROOT_SUITE, |title| title.as_str());
            by_suite.entry(name).or_default().push(result);
        }
        by_suite
            .into_iter()
            .map(|(name, cases)| TestSuite { name, cases })
            .collect()
    }

    fn serialize(&self, results: &RunResults) -> Result<(), HarnessError> {
        let mut sink = self.writer.borrow_mut();
        let mut writer = quick_xml::Writer::new_with_indent(&mut *sink, b' ', 4);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut suites_tag = BytesStart::new("testsuites");
        suites_tag.extend_attributes([
            ("name", self.name.as_str()),
            ("tests", results.total_tests.to_string().as_str()),
            ("failures", results.total_failures.to_string().as_str()),
            ("errors", results.total_timeouts.to_string().as_str()),
            ("skipped", results.total_skipped.to_string().as_str()),
            ("time", seconds(results.elapsed).as_str()),
            (
                "timestamp",
                chrono::Local::now()
                    .format("%Y-%m-%dT%H:%M:%S")
                    .to_string()
                    .as_str(),
            ),
        ]);
        writer.write_event(Event::Start(suites_tag))?;

        for suite in Self::suites(results) {
            serialize_suite(&suite, &mut writer)?;
        }

        writer.write_event(Event::End(BytesEnd::new("testsuites")))?;
        writer.write_indent()?;
        Ok(())
    }
}

fn seconds(elapsed: Duration) -> String {
    format!("{:.3}", elapsed.as_secs_f64())
}

fn serialize_suite(
    suite: &TestSuite<'_>,
    writer: &mut quick_xml::Writer<impl std::io::Write>,
) -> Result<(), HarnessError> {
    let executed = suite.cases.len() - suite.count(&[Outcome::Skipped]);
    let mut suite_tag = BytesStart::new("testsuite");
    suite_tag.extend_attributes([
        ("name", suite.name),
        ("tests", executed.to_string().as_str()),
        ("failures", suite.count(&[Outcome::Fail]).to_string().as_str()),
        ("errors", suite.count(&[Outcome::Timeout]).to_string().as_str()),
        ("skipped", suite.count(&[Outcome::Skipped]).to_string().as_str()),
        ("time", seconds(suite.time()).as_str()),
    ]);
    writer.write_event(Event::Start(suite_tag))?;

    for case in &suite.cases {
        let classname = case.title_chain.join(".");
        let mut case_tag = BytesStart::new("testcase");
        case_tag.extend_attributes([
            ("name", case.title.as_str()),
            ("classname", classname.as_str()),
            ("file", case.file.as_str()),
            ("time", seconds(case.elapsed).as_str()),
        ]);

        match (&case.outcome, &case.error) {
            (Outcome::Success, _) => writer.write_event(Event::Empty(case_tag))?,
            (Outcome::Skipped, _) => {
                writer.write_event(Event::Start(case_tag))?;
                writer.write_event(Event::Empty(BytesStart::new("skipped")))?;
                writer.write_event(Event::End(BytesEnd::new("testcase")))?;
            }
            (outcome, error) => {
                let (tag, kind) = match outcome {
                    Outcome::Timeout => ("error", "timeout"),
                    _ => ("failure", "fail"),
                };
                let message = error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                writer.write_event(Event::Start(case_tag))?;
                let mut failure_tag = BytesStart::new(tag);
                failure_tag.extend_attributes([("message", message.as_str()), ("type", kind)]);
                writer.write_event(Event::Start(failure_tag))?;
                writer.write_event(Event::Text(BytesText::new(&message)))?;
                writer.write_event(Event::End(BytesEnd::new(tag)))?;
                writer.write_event(Event::End(BytesEnd::new("testcase")))?;
            }
        }
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    Ok(())
}

impl Listener for JunitReporter {
    fn run_finished(&self, results: &RunResults) {
        if let Err(e) = self.serialize(results) {
            error!("unable to write junit report: {e}");
        }
    }
}
