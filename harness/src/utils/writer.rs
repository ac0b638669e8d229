// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io::{Stderr, Stdout, Write};

use crate::errors::HarnessError;

/// Output sink shared by the reporters and the command line surface.
pub struct Writer {
    buffer: WriteBuffer,
    err: WriteBuffer,
}

impl Writer {
    pub fn new(buffer: WriteBuffer) -> Self {
        Self {
            buffer,
            err: WriteBuffer::Stderr(std::io::stderr()),
        }
    }

    pub fn new_with_err(buffer: WriteBuffer, err: WriteBuffer) -> Self {
        Self { buffer, err }
    }

    /// An in-memory writer, as used by tests and by reporters whose output
    /// is forwarded elsewhere.
    pub fn in_memory() -> Self {
        Self::new_with_err(WriteBuffer::Vec(vec![]), WriteBuffer::Vec(vec![]))
    }

    pub fn write_err(&mut self, message: String) -> std::io::Result<()> {
        writeln!(self.err, "{message}")
    }

    pub fn into_string(self) -> Result<String, HarnessError> {
        self.buffer.into_string()
    }

    pub fn err_to_string(self) -> Result<String, HarnessError> {
        self.err.into_string()
    }

    /// Content with ANSI color codes removed.
    pub fn stripped(self) -> Result<String, HarnessError> {
        let content = self.buffer.into_string()?;
        let stripped = strip_ansi_escapes::strip(content.as_bytes())?;
        Ok(String::from_utf8(stripped)?)
    }
}

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.buffer.flush()
    }
}

pub enum WriteBuffer {
    Stdout(Stdout),
    Stderr(Stderr),
    Vec(Vec<u8>),
    File(File),
}

impl WriteBuffer {
    fn into_string(self) -> Result<String, HarnessError> {
        match self {
            WriteBuffer::Vec(vec) => Ok(String::from_utf8(vec)?),
            WriteBuffer::Stdout(..) | WriteBuffer::Stderr(..) | WriteBuffer::File(..) => {
                Err(HarnessError::IoError(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "only in-memory buffers can be read back",
                )))
            }
        }
    }
}

impl Write for WriteBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            WriteBuffer::Stdout(stdout) => stdout.write(buf),
            WriteBuffer::Stderr(stderr) => stderr.write(buf),
            WriteBuffer::Vec(vec) => vec.write(buf),
            WriteBuffer::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            WriteBuffer::Stdout(stdout) => stdout.flush(),
            WriteBuffer::Stderr(stderr) => stderr.flush(),
            WriteBuffer::Vec(vec) => vec.flush(),
            WriteBuffer::File(file) => file.flush(),
        }
    }
}
