// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};
use std::rc::Rc;
use std::str::FromStr;

use crate::errors::HarnessError;
use crate::runner::events::Listener;
use crate::utils::writer::Writer;

pub mod console;
pub mod junit;
pub mod structured;

use console::ConsoleReporter;
use junit::JunitReporter;
use structured::{StructuredFormat, StructuredReporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Console,
    Json,
    Yaml,
    Junit,
}

impl OutputFormat {
    pub const VALUES: [&'static str; 4] = ["console", "json", "yaml", "junit"];
}

impl FromStr for OutputFormat {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "console" => Ok(OutputFormat::Console),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            "junit" => Ok(OutputFormat::Junit),
            _ => Err(HarnessError::ConfigError(format!(
                "unknown output format `{s}`, expected one of {}",
                OutputFormat::VALUES.join(", ")
            ))),
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OutputFormat::Console => "console",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Junit => "junit",
        })
    }
}

/// A reporter of any output format. The harness only ever sees the
/// [`Listener`] half; the owner keeps this handle to recover the writer
/// once the run is over.
pub enum Reporter {
    Console(Rc<ConsoleReporter>),
    Structured(Rc<StructuredReporter>),
    Junit(Rc<JunitReporter>),
}

impl Reporter {
    pub fn new(format: OutputFormat, writer: Writer, name: &str) -> Self {
        match format {
            OutputFormat::Console => Reporter::Console(Rc::new(ConsoleReporter::new(writer))),
            OutputFormat::Json => Reporter::Structured(Rc::new(StructuredReporter::new(
                writer,
                StructuredFormat::Json,
            ))),
            OutputFormat::Yaml => Reporter::Structured(Rc::new(StructuredReporter::new(
                writer,
                StructuredFormat::Yaml,
            ))),
            OutputFormat::Junit => Reporter::Junit(Rc::new(JunitReporter::new(writer, name))),
        }
    }

    pub fn listener(&self) -> Rc<dyn Listener> {
        match self {
            Reporter::Console(reporter) => reporter.clone(),
            Reporter::Structured(reporter) => reporter.clone(),
            Reporter::Junit(reporter) => reporter.clone(),
        }
    }

    /// Recovers the writer. Fails while the listener is still registered
    /// with a harness.
    pub fn into_writer(self) -> Result<Writer, HarnessError> {
        let still_shared = || {
            HarnessError::ConfigError(String::from(
                "reporter is still attached to a harness",
            ))
        };
        match self {
            Reporter::Console(reporter) => Rc::try_unwrap(reporter)
                .map(ConsoleReporter::into_writer)
                .map_err(|_| still_shared()),
            Reporter::Structured(reporter) => Rc::try_unwrap(reporter)
                .map(StructuredReporter::into_writer)
                .map_err(|_| still_shared()),
            Reporter::Junit(reporter) => Rc::try_unwrap(reporter)
                .map(JunitReporter::into_writer)
                .map_err(|_| still_shared()),
        }
    }
}
