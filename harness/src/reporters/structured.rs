// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::io::Write;

use log::error;

use crate::errors::HarnessError;
use crate::runner::events::Listener;
use crate::runner::results::RunResults;
use crate::utils::writer::Writer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredFormat {
    Json,
    Yaml,
}

/// Serializes the run results once the run has finished.
pub struct StructuredReporter {
    writer: RefCell<Writer>,
    format: StructuredFormat,
}

impl StructuredReporter {
    pub fn new(writer: Writer, format: StructuredFormat) -> Self {
        StructuredReporter {
            writer: RefCell::new(writer),
            format,
        }
    }

    pub fn into_writer(self) -> Writer {
        self.writer.into_inner()
    }

    fn report(&self, results: &RunResults) -> Result<(), HarnessError> {
        let mut writer = self.writer.borrow_mut();
        match self.format {
            StructuredFormat::Json => {
                serde_json::to_writer_pretty(&mut *writer, results)?;
                writeln!(writer)?;
            }
            StructuredFormat::Yaml => serde_yaml::to_writer(&mut *writer, results)?,
        }
        Ok(())
    }
}

impl Listener for StructuredReporter {
    fn run_finished(&self, results: &RunResults) {
        if let Err(e) = self.report(results) {
            error!("unable to write structured report: {e}");
        }
    }
}
